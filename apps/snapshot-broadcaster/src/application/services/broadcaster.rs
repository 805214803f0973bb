//! Snapshot Broadcaster
//!
//! Owns one polling loop per connection. Each loop runs a poll cycle
//! immediately on connect and then re-arms itself a fixed interval after
//! the previous cycle settled, so cycles for one connection never overlap.
//!
//! # Poll Cycle
//!
//! 1. Every registered fetch group runs concurrently
//! 2. Each snapshot is delivered as soon as its own group resolves
//! 3. Group-level failures are logged and skipped for this cycle only
//! 4. A closed outbound channel is treated as a disconnect
//!
//! # Cancellation
//!
//! Each connection holds a child of the broadcaster's root
//! `CancellationToken`. Disconnect cancels the token: the timer never
//! re-arms and snapshots still produced by an in-flight cycle are
//! discarded instead of delivered.
//!
//! Connections share nothing but read-only configuration and the
//! provider handle.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::fetch_groups::FetchGroup;
use crate::application::ports::{NoopObserver, SharedObserver, SharedQuoteProvider};
use crate::domain::connection::{ConnectionId, ConnectionState};
use crate::domain::snapshot::{Snapshot, SnapshotKind};

/// Default time between the end of one cycle and the start of the next.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default capacity of each connection's outbound queue.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Receiving half of a connection's outbound queue.
pub type SnapshotReceiver = mpsc::Receiver<Arc<Snapshot>>;

// =============================================================================
// Configuration
// =============================================================================

/// Broadcaster timing and queue configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcasterConfig {
    /// Delay between a settled cycle and the next one.
    pub poll_interval: Duration,
    /// Capacity of each connection's outbound queue.
    pub channel_capacity: usize,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

// =============================================================================
// Connection
// =============================================================================

/// Why a snapshot could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The client side of the channel is gone.
    #[error("connection closed")]
    Closed,
    /// The connection was cancelled while the snapshot was pending.
    #[error("connection cancelled")]
    Cancelled,
}

/// Server-side half of a client subscription.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    sink: mpsc::Sender<Arc<Snapshot>>,
}

impl Connection {
    /// Create a connection and the receiver its snapshots arrive on.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, SnapshotReceiver) {
        let (sink, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: ConnectionId::new(),
                sink,
            },
            rx,
        )
    }

    /// Connection identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Whether the receiving side has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sink.is_closed()
    }

    async fn deliver(
        &self,
        snapshot: Arc<Snapshot>,
        cancel: &CancellationToken,
    ) -> Result<(), DeliveryError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(DeliveryError::Cancelled),
            sent = self.sink.send(snapshot) => sent.map_err(|_| DeliveryError::Closed),
        }
    }
}

struct ConnectionHandle {
    cancel: CancellationToken,
    connected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleOutcome {
    Settled,
    ConnectionLost,
}

// =============================================================================
// Statistics
// =============================================================================

#[derive(Debug, Default)]
struct Counters {
    cycles_completed: AtomicU64,
    snapshots_delivered: AtomicU64,
    snapshots_discarded: AtomicU64,
    group_failures: AtomicU64,
    last_delivery_at: RwLock<Option<DateTime<Utc>>>,
    last_group_failure_at: RwLock<Option<DateTime<Utc>>>,
}

/// Point-in-time broadcaster statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcasterStats {
    /// Currently registered connections.
    pub connections: usize,
    /// Poll cycles that ran to completion.
    pub cycles_completed: u64,
    /// Snapshots handed to connections.
    pub snapshots_delivered: u64,
    /// Snapshots produced for connections that had already gone away.
    pub snapshots_discarded: u64,
    /// Fetch group failures.
    pub group_failures: u64,
    /// Time of the most recent delivery.
    pub last_delivery_at: Option<DateTime<Utc>>,
    /// Time of the most recent group failure.
    pub last_group_failure_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Broadcaster
// =============================================================================

/// Periodic snapshot producer with one independent loop per connection.
pub struct SnapshotBroadcaster {
    config: BroadcasterConfig,
    provider: SharedQuoteProvider,
    groups: Vec<Arc<dyn FetchGroup>>,
    connections: Mutex<HashMap<ConnectionId, ConnectionHandle>>,
    root: CancellationToken,
    counters: Counters,
    observer: SharedObserver,
}

impl SnapshotBroadcaster {
    /// Create a broadcaster.
    #[must_use]
    pub fn new(
        config: BroadcasterConfig,
        provider: SharedQuoteProvider,
        groups: Vec<Arc<dyn FetchGroup>>,
    ) -> Self {
        Self {
            config,
            provider,
            groups,
            connections: Mutex::new(HashMap::new()),
            root: CancellationToken::new(),
            counters: Counters::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Report lifecycle events to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Broadcaster configuration.
    #[must_use]
    pub const fn config(&self) -> &BroadcasterConfig {
        &self.config
    }

    /// Snapshot kinds produced each cycle.
    #[must_use]
    pub fn kinds(&self) -> Vec<SnapshotKind> {
        self.groups.iter().map(|g| g.kind()).collect()
    }

    /// Register a connection and start its polling loop.
    ///
    /// The first cycle runs immediately; later cycles are scheduled one
    /// poll interval after the previous cycle settles.
    pub fn on_connect(self: &Arc<Self>, connection: Connection) {
        if self.root.is_cancelled() {
            tracing::warn!(connection_id = %connection.id(), "Broadcaster shut down, rejecting connection");
            return;
        }

        let id = connection.id();
        let cancel = self.root.child_token();

        let previous = self.connections.lock().insert(
            id,
            ConnectionHandle {
                cancel: cancel.clone(),
                connected_at: Utc::now(),
            },
        );
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        self.publish_connection_count();
        tracing::info!(connection_id = %id, "Client connected");

        let broadcaster = Arc::clone(self);
        tokio::spawn(async move {
            broadcaster.run_connection(connection, cancel).await;
        });
    }

    /// Unregister a connection and stop its polling loop.
    ///
    /// Idempotent: returns `false` if the connection was not registered.
    pub fn on_disconnect(&self, id: ConnectionId) -> bool {
        let Some(handle) = self.connections.lock().remove(&id) else {
            return false;
        };

        handle.cancel.cancel();
        self.publish_connection_count();

        let connected_secs = (Utc::now() - handle.connected_at).num_seconds();
        tracing::info!(connection_id = %id, connected_secs, "Client disconnected");
        true
    }

    /// Cancel every connection and refuse new ones.
    pub fn shutdown(&self) {
        self.root.cancel();
        let drained: Vec<_> = self.connections.lock().drain().collect();
        for (_, handle) in &drained {
            handle.cancel.cancel();
        }
        self.publish_connection_count();
        tracing::info!(connections = drained.len(), "Broadcaster shut down");
    }

    /// Whether new connections are accepted.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        !self.root.is_cancelled()
    }

    /// Number of registered connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Lifecycle state of a connection.
    #[must_use]
    pub fn connection_state(&self, id: ConnectionId) -> ConnectionState {
        if self.connections.lock().contains_key(&id) {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> BroadcasterStats {
        BroadcasterStats {
            connections: self.connection_count(),
            cycles_completed: self.counters.cycles_completed.load(Ordering::Relaxed),
            snapshots_delivered: self.counters.snapshots_delivered.load(Ordering::Relaxed),
            snapshots_discarded: self.counters.snapshots_discarded.load(Ordering::Relaxed),
            group_failures: self.counters.group_failures.load(Ordering::Relaxed),
            last_delivery_at: *self.counters.last_delivery_at.read(),
            last_group_failure_at: *self.counters.last_group_failure_at.read(),
        }
    }

    async fn run_connection(self: Arc<Self>, connection: Connection, cancel: CancellationToken) {
        let id = connection.id();

        loop {
            if cancel.is_cancelled() {
                break;
            }

            if self.poll(&connection, &cancel).await == CycleOutcome::ConnectionLost {
                tracing::debug!(connection_id = %id, "Outbound channel closed during delivery");
                self.on_disconnect(id);
                break;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        tracing::debug!(connection_id = %id, "Polling loop stopped");
    }

    async fn poll(&self, connection: &Connection, cancel: &CancellationToken) -> CycleOutcome {
        let started = Instant::now();
        let provider = self.provider.as_ref();

        let mut pending: FuturesUnordered<_> = self
            .groups
            .iter()
            .map(|group| async move { (group.kind(), group.fetch(provider).await) })
            .collect();

        let mut outcome = CycleOutcome::Settled;

        while let Some((kind, result)) = pending.next().await {
            let payload = match result {
                Ok(payload) => payload,
                Err(e) => {
                    self.counters.group_failures.fetch_add(1, Ordering::Relaxed);
                    *self.counters.last_group_failure_at.write() = Some(Utc::now());
                    self.observer.group_failed(kind);
                    tracing::warn!(
                        connection_id = %connection.id(),
                        kind = kind.as_str(),
                        error = %e,
                        "Fetch group failed, skipping snapshot this cycle"
                    );
                    continue;
                }
            };

            if outcome == CycleOutcome::ConnectionLost || cancel.is_cancelled() {
                self.record_discarded(kind);
                continue;
            }

            let snapshot = Arc::new(Snapshot::new(payload));
            match connection.deliver(snapshot, cancel).await {
                Ok(()) => {
                    self.counters
                        .snapshots_delivered
                        .fetch_add(1, Ordering::Relaxed);
                    *self.counters.last_delivery_at.write() = Some(Utc::now());
                    self.observer.snapshot_delivered(kind);
                    tracing::trace!(connection_id = %connection.id(), kind = kind.as_str(), "Snapshot delivered");
                }
                Err(DeliveryError::Closed) => {
                    outcome = CycleOutcome::ConnectionLost;
                    self.record_discarded(kind);
                }
                Err(DeliveryError::Cancelled) => self.record_discarded(kind),
            }
        }

        self.counters.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.observer.cycle_completed(started.elapsed());

        outcome
    }

    fn record_discarded(&self, kind: SnapshotKind) {
        self.counters
            .snapshots_discarded
            .fetch_add(1, Ordering::Relaxed);
        self.observer.snapshot_discarded(kind);
    }

    fn publish_connection_count(&self) {
        self.observer.connections_changed(self.connection_count());
    }
}

impl std::fmt::Debug for SnapshotBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotBroadcaster")
            .field("config", &self.config)
            .field("groups", &self.kinds())
            .field("connections", &self.connection_count())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
