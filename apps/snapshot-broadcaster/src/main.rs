//! Snapshot Broadcaster Binary
//!
//! Starts the market dashboard push server.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin snapshot-broadcaster
//! ```
//!
//! # Environment Variables
//!
//! All optional.
//! - `PORT`: WebSocket push and candle API port (default: 4000)
//! - `SNAPSHOT_HEALTH_PORT`: Health check HTTP port (default: 8083)
//! - `SNAPSHOT_POLL_INTERVAL_SECS`: Delay between poll cycles (default: 10)
//! - `SNAPSHOT_CHANNEL_CAPACITY`: Outbound queue per client (default: 16)
//! - `SNAPSHOT_FALLBACK_CURRENCY`: Currency for country indices (default: INR)
//! - `SNAPSHOT_COALESCE_UPSTREAM`: Share in-flight upstream calls (default: true)
//! - `YAHOO_BASE_URL`: Quote provider base URL (default: <https://query1.finance.yahoo.com>)
//! - `YAHOO_TIMEOUT_MS`: Per-request upstream timeout (default: 5000)
//! - `OTEL_ENABLED`: Enable OpenTelemetry export (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: market-snapshot-broadcaster)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use snapshot_broadcaster::domain::watchlist::default_country_indices;
use snapshot_broadcaster::infrastructure::health::{HealthServer, HealthServerState};
use snapshot_broadcaster::infrastructure::push::{PushServer, PushServerState};
use snapshot_broadcaster::infrastructure::telemetry;
use snapshot_broadcaster::{
    AppConfig, CountryIndicesGroup, DashboardGroup, FetchGroup, PrometheusObserver,
    SharedQuoteProvider, SingleFlightProvider, SnapshotBroadcaster, YahooQuoteProvider,
    init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let crypto_installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok();

    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Snapshot Broadcaster");
    if !crypto_installed {
        tracing::debug!("rustls crypto provider already installed");
    }

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = AppConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Upstream provider, optionally coalesced across connections
    let yahoo = Arc::new(YahooQuoteProvider::new(&config.provider)?);
    let quotes: SharedQuoteProvider = Arc::clone(&yahoo) as SharedQuoteProvider;
    let provider: SharedQuoteProvider = if config.poll.coalesce_upstream {
        Arc::new(SingleFlightProvider::new(quotes))
    } else {
        quotes
    };

    let groups: Vec<Arc<dyn FetchGroup>> = vec![
        Arc::new(DashboardGroup::with_defaults()),
        Arc::new(CountryIndicesGroup::new(
            default_country_indices(),
            config.poll.fallback_currency.clone(),
        )),
    ];

    let broadcaster = Arc::new(
        SnapshotBroadcaster::new(config.broadcaster(), provider, groups)
            .with_observer(Arc::new(PrometheusObserver)),
    );

    // Initialize health server
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        Arc::clone(&broadcaster),
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );

    // Initialize push server
    let push_state = Arc::new(PushServerState::new(
        Arc::clone(&broadcaster),
        yahoo,
        shutdown_token.clone(),
    ));
    let push_server = PushServer::new(config.server.port, push_state);

    // Spawn health server
    let health_task = tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    // Spawn push server
    let push_task = tokio::spawn(async move {
        if let Err(e) = push_server.run().await {
            tracing::error!(error = %e, "Push server error");
        }
    });

    tracing::info!("Snapshot broadcaster ready");

    await_shutdown(shutdown_token).await;
    broadcaster.shutdown();

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        let _ = tokio::join!(health_task, push_task);
    })
    .await
    .is_err()
    {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Servers did not stop before the shutdown timeout"
        );
    }

    tracing::info!("Snapshot broadcaster stopped");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Log the parsed configuration.
fn log_config(config: &AppConfig) {
    tracing::info!(
        port = config.server.port,
        health_port = config.server.health_port,
        poll_interval_secs = config.poll.interval.as_secs(),
        channel_capacity = config.poll.channel_capacity,
        coalesce_upstream = config.poll.coalesce_upstream,
        "Configuration loaded"
    );
    tracing::debug!(
        base_url = %config.provider.base_url,
        timeout_ms = u64::try_from(config.provider.timeout.as_millis()).unwrap_or(u64::MAX),
        fallback_currency = %config.poll.fallback_currency,
        "Quote provider settings"
    );
}

/// Load .env file from any ancestor directory.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
