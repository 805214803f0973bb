//! Prometheus Metrics Module
//!
//! Exposes broadcaster metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Connections**: Subscribed push clients
//! - **Snapshots**: Delivered and discarded snapshots by kind
//! - **Upstream**: Provider call outcomes and fetch group failures
//! - **Latency**: Poll cycle duration
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::application::ports::BroadcastObserver;
use crate::domain::snapshot::SnapshotKind;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Safe to call more than once; later calls return the first handle. If a
/// different global recorder is already installed the handle still renders,
/// but nothing recorded through the `metrics` macros reaches it.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();

            if let Err(e) = metrics::set_global_recorder(recorder) {
                tracing::warn!(error = %e, "Metrics recorder already installed");
            }

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Connection gauges
    describe_gauge!(
        "snapshot_broadcaster_connections",
        "Number of subscribed push clients"
    );

    // Snapshot counters
    describe_counter!(
        "snapshot_broadcaster_snapshots_delivered_total",
        "Total snapshots handed to push clients"
    );
    describe_counter!(
        "snapshot_broadcaster_snapshots_discarded_total",
        "Total snapshots discarded because the client had gone away"
    );

    // Upstream counters
    describe_counter!(
        "snapshot_broadcaster_group_failures_total",
        "Total fetch groups that failed before issuing any call"
    );
    describe_counter!(
        "snapshot_broadcaster_provider_calls_total",
        "Total quote provider calls by outcome"
    );

    // Latency histograms
    describe_histogram!(
        "snapshot_broadcaster_cycle_seconds",
        "Time for one poll cycle to settle"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Update the subscribed client count.
pub fn set_connections(count: f64) {
    gauge!("snapshot_broadcaster_connections").set(count);
}

/// Record a snapshot delivered to a client.
pub fn record_snapshot_delivered(kind: SnapshotKind) {
    counter!(
        "snapshot_broadcaster_snapshots_delivered_total",
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Record a snapshot produced for a client that had already disconnected.
pub fn record_snapshot_discarded(kind: SnapshotKind) {
    counter!(
        "snapshot_broadcaster_snapshots_discarded_total",
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Record a fetch group failure.
pub fn record_group_failure(kind: SnapshotKind) {
    counter!(
        "snapshot_broadcaster_group_failures_total",
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Record the outcome of one quote provider call.
pub fn record_provider_call(outcome: &'static str) {
    counter!(
        "snapshot_broadcaster_provider_calls_total",
        "outcome" => outcome
    )
    .increment(1);
}

/// Record poll cycle duration.
pub fn record_cycle_duration(duration: Duration) {
    histogram!("snapshot_broadcaster_cycle_seconds").record(duration.as_secs_f64());
}

// =============================================================================
// Broadcaster Observer
// =============================================================================

/// Forwards broadcaster events to the Prometheus recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusObserver;

impl BroadcastObserver for PrometheusObserver {
    #[allow(clippy::cast_precision_loss)]
    fn connections_changed(&self, count: usize) {
        set_connections(count as f64);
    }

    fn snapshot_delivered(&self, kind: SnapshotKind) {
        record_snapshot_delivered(kind);
    }

    fn snapshot_discarded(&self, kind: SnapshotKind) {
        record_snapshot_discarded(kind);
    }

    fn group_failed(&self, kind: SnapshotKind) {
        record_group_failure(kind);
    }

    fn cycle_completed(&self, elapsed: Duration) {
        record_cycle_duration(elapsed);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent_and_renders_recorded_metrics() {
        let _first = init_metrics();
        let second = init_metrics();

        record_snapshot_delivered(SnapshotKind::Dashboard);
        record_provider_call("timeout");

        assert!(get_metrics_handle().is_some());
        let rendered = second.render();
        assert!(rendered.contains("snapshot_broadcaster_snapshots_delivered_total"));
        assert!(rendered.contains("outcome=\"timeout\""));
    }

    #[test]
    fn observer_records_through_global_recorder() {
        let handle = init_metrics();

        let observer = PrometheusObserver;
        observer.connections_changed(3);
        observer.group_failed(SnapshotKind::CountryIndices);
        observer.cycle_completed(Duration::from_millis(250));

        let rendered = handle.render();
        assert!(rendered.contains("snapshot_broadcaster_connections"));
        assert!(rendered.contains("snapshot_broadcaster_group_failures_total"));
        assert!(rendered.contains("kind=\"country-indices\""));
        assert!(rendered.contains("snapshot_broadcaster_cycle_seconds"));
    }
}
