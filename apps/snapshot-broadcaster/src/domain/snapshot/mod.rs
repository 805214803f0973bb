//! Snapshot Types
//!
//! A snapshot is the immutable result of one fetch group in one poll cycle.
//! Snapshots are built fresh every cycle, shared as `Arc<Snapshot>` while
//! being delivered, and dropped afterwards.
//!
//! # Wire Format
//!
//! Each snapshot is sent as a single JSON text frame:
//!
//! ```json
//! {"event": "dashboardUpdate", "data": { ... }, "capturedAt": "2026-01-01T09:15:00Z"}
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, Serializer};

use super::quote::QuoteRecord;

// =============================================================================
// Snapshot Kind
// =============================================================================

/// The kind of snapshot a fetch group produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    /// Headline index quotes plus top movers.
    Dashboard,
    /// Index quotes grouped by country.
    CountryIndices,
}

impl SnapshotKind {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::CountryIndices => "country-indices",
        }
    }

    /// Event name clients listen for.
    #[must_use]
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboardUpdate",
            Self::CountryIndices => "countryIndicesUpdate",
        }
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Series Map
// =============================================================================

/// Ordered mapping from series key to value.
///
/// Serializes as a JSON object while keeping the configured key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesMap<V>(Vec<(String, V)>);

impl<V> SeriesMap<V> {
    /// Create an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a series. Keys are expected to be unique.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.0.push((key.into(), value));
    }

    /// Look up a series by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Series keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    /// Iterate over `(key, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no series.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> Default for SeriesMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<(String, V)> for SeriesMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<V: Serialize> Serialize for SeriesMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// Dashboard payload: headline indices and top movers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DashboardSnapshot {
    /// Index records keyed by series key (e.g. `nifty50`).
    pub indices: SeriesMap<QuoteRecord>,
    /// Names of the strongest advancers.
    pub gainers: Vec<String>,
    /// Names of the weakest decliners.
    pub losers: Vec<String>,
}

/// Country payload: index records grouped by country key.
pub type CountryIndicesSnapshot = SeriesMap<Vec<QuoteRecord>>;

/// Payload of a snapshot, one variant per kind.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum SnapshotPayload {
    /// Dashboard payload.
    Dashboard(DashboardSnapshot),
    /// Country indices payload.
    CountryIndices(CountryIndicesSnapshot),
}

impl SnapshotPayload {
    /// Kind of this payload.
    #[must_use]
    pub const fn kind(&self) -> SnapshotKind {
        match self {
            Self::Dashboard(_) => SnapshotKind::Dashboard,
            Self::CountryIndices(_) => SnapshotKind::CountryIndices,
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable aggregated result of one fetch group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    kind: SnapshotKind,
    payload: SnapshotPayload,
    captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// Capture a snapshot now.
    #[must_use]
    pub fn new(payload: SnapshotPayload) -> Self {
        Self::captured_at(payload, Utc::now())
    }

    /// Capture a snapshot at a given time.
    #[must_use]
    pub const fn captured_at(payload: SnapshotPayload, captured_at: DateTime<Utc>) -> Self {
        Self {
            kind: payload.kind(),
            payload,
            captured_at,
        }
    }

    /// Snapshot kind.
    #[must_use]
    pub const fn kind(&self) -> SnapshotKind {
        self.kind
    }

    /// Snapshot payload.
    #[must_use]
    pub const fn payload(&self) -> &SnapshotPayload {
        &self.payload
    }

    /// Capture timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Encode as a wire frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&Frame {
            event: self.kind.event_name(),
            data: &self.payload,
            captured_at: self.captured_at,
        })
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct Frame<'a> {
    event: &'static str,
    data: &'a SnapshotPayload,
    captured_at: DateTime<Utc>,
}

// =============================================================================
// Tests
// =============================================================================
