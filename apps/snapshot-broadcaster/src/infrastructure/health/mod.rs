//! Health Check and Metrics Endpoint
//!
//! HTTP endpoint for health checks, broadcaster status reporting, and Prometheus metrics.
//! Used by container orchestrators, load balancers, and monitoring systems.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Kubernetes liveness check (simple OK)
//! - `GET /readyz` - Kubernetes readiness check (broadcaster accepting clients)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::{BroadcasterStats, SnapshotBroadcaster};
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", or "unhealthy".
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Poll interval in seconds.
    pub poll_interval_secs: u64,
    /// Subscribed client count.
    pub clients: usize,
    /// Snapshot production statistics.
    pub snapshots: SnapshotStatus,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational.
    Healthy,
    /// Upstream failing but the service is up.
    Degraded,
    /// Broadcaster is not accepting clients.
    Unhealthy,
}

/// Snapshot production statistics.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotStatus {
    /// Completed poll cycles.
    pub cycles_completed: u64,
    /// Snapshots delivered.
    pub delivered: u64,
    /// Snapshots discarded after disconnect.
    pub discarded: u64,
    /// Fetch group failures.
    pub group_failures: u64,
    /// Time of the most recent delivery.
    pub last_delivery_at: Option<DateTime<Utc>>,
    /// Time of the most recent group failure.
    pub last_group_failure_at: Option<DateTime<Utc>>,
}

impl From<&BroadcasterStats> for SnapshotStatus {
    fn from(stats: &BroadcasterStats) -> Self {
        Self {
            cycles_completed: stats.cycles_completed,
            delivered: stats.snapshots_delivered,
            discarded: stats.snapshots_discarded,
            group_failures: stats.group_failures,
            last_delivery_at: stats.last_delivery_at,
            last_group_failure_at: stats.last_group_failure_at,
        }
    }
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    broadcaster: Arc<SnapshotBroadcaster>,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(version: String, broadcaster: Arc<SnapshotBroadcaster>) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            broadcaster,
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Health server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

/// Build the health router.
#[must_use]
pub fn router(state: Arc<HealthServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.broadcaster.is_accepting() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    let stats = state.broadcaster.stats();
    let status = determine_health_status(state.broadcaster.is_accepting(), &stats);

    HealthResponse {
        status,
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        poll_interval_secs: state.broadcaster.config().poll_interval.as_secs(),
        clients: stats.connections,
        snapshots: SnapshotStatus::from(&stats),
    }
}

/// Degraded while the most recent group outcome is a failure.
fn determine_health_status(accepting: bool, stats: &BroadcasterStats) -> HealthStatus {
    if !accepting {
        return HealthStatus::Unhealthy;
    }

    match (stats.last_group_failure_at, stats.last_delivery_at) {
        (Some(failed), Some(delivered)) if failed > delivered => HealthStatus::Degraded,
        (Some(_), None) => HealthStatus::Degraded,
        _ => HealthStatus::Healthy,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
