#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Snapshot Broadcaster - Market Dashboard Push Server
//!
//! Periodically polls a quote provider on behalf of every connected
//! dashboard client and pushes aggregated market snapshots to it.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Snapshot types and normalization rules
//!   - `quote`: Provider quotes and normalized records
//!   - `candle`: OHLC candles and the interval whitelist
//!   - `snapshot`: Snapshot kinds, payloads and wire frames
//!   - `watchlist`: Series keys, display names and symbols
//!   - `connection`: Connection identity and state
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Quote and candle providers, broadcaster observer
//!   - `services`: Broadcaster, fetch groups, single-flight coalescing
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `yahoo`: Yahoo Finance quote and candle provider
//!   - `push`: WebSocket push server and candle API
//!   - `config`: Configuration loading
//!   - `health`: Health check HTTP endpoint
//!   - `metrics`: Prometheus recorder and broadcaster observer
//!
//! # Data Flow
//!
//! ```text
//!                  ┌──────────────┐     ┌──────────────┐
//! Yahoo Finance ◄──┤ Single-Flight│◄────┤ Fetch Groups │
//!                  └──────────────┘     └──────┬───────┘
//!                                              │ per connection, every cycle
//!                                       ┌──────▼───────┐
//!                                       │ Broadcaster  │──► Client 1
//!                                       │ (poll loops) │──► Client 2
//!                                       └──────────────┘──► Client N
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Snapshot types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::candle::{Candle, CandleRequest, ChartInterval};
pub use domain::connection::{ConnectionId, ConnectionState};
pub use domain::quote::{ProviderQuote, QuoteRecord};
pub use domain::snapshot::{
    CountryIndicesSnapshot, DashboardSnapshot, SeriesMap, Snapshot, SnapshotKind, SnapshotPayload,
};

// Ports and services
pub use application::ports::{
    BroadcastObserver, CandleProvider, NoopObserver, ProviderError, QuoteProvider,
    SharedCandleProvider, SharedObserver, SharedQuoteProvider,
};
pub use application::services::{
    BroadcasterConfig, BroadcasterStats, Connection, CountryIndicesGroup, DashboardGroup,
    DeliveryError, FetchGroup, GroupError, SingleFlightProvider, SnapshotBroadcaster,
    SnapshotReceiver,
};

// Infrastructure config
pub use infrastructure::config::{
    AppConfig, ConfigError, PollSettings, ProviderSettings, ServerSettings,
};

// Servers
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};
pub use infrastructure::push::{PushServer, PushServerError, PushServerState};

// Upstream provider
pub use infrastructure::yahoo::YahooQuoteProvider;

// Metrics
pub use infrastructure::metrics::{PrometheusObserver, init_metrics};

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
