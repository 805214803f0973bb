//! Push server implementation.
//!
//! Bridges WebSocket clients onto broadcaster connections and serves the
//! candle API from the same listener.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::application::ports::{ProviderError, SharedCandleProvider};
use crate::application::services::{Connection, SnapshotBroadcaster};
use crate::domain::candle::{Candle, CandleRequest, ChartInterval};

/// Error message returned when the candle API is called without a symbol.
pub const MISSING_SYMBOL: &str = "Missing symbol parameter";

/// Error message returned when the provider has no candles for a symbol.
pub const NO_STOCK_DATA: &str = "No stock data found";

// =============================================================================
// Server State
// =============================================================================

/// Shared state for the push server.
pub struct PushServerState {
    broadcaster: Arc<SnapshotBroadcaster>,
    candles: SharedCandleProvider,
    cancel: CancellationToken,
}

impl PushServerState {
    /// Create new push server state.
    #[must_use]
    pub const fn new(
        broadcaster: Arc<SnapshotBroadcaster>,
        candles: SharedCandleProvider,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            broadcaster,
            candles,
            cancel,
        }
    }
}

// =============================================================================
// Push Server
// =============================================================================

/// WebSocket push and stock-data API server.
pub struct PushServer {
    port: u16,
    state: Arc<PushServerState>,
}

impl PushServer {
    /// Create a new push server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<PushServerState>) -> Self {
        Self { port, state }
    }

    /// Bind and run the push server until the state's token is cancelled.
    ///
    /// # Errors
    ///
    /// Returns `PushServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), PushServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| PushServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Push server listening");
        serve(listener, self.state).await
    }
}

/// Serve the push router on an already bound listener.
///
/// # Errors
///
/// Returns `PushServerError::ServerFailed` if the HTTP server fails.
pub async fn serve(listener: TcpListener, state: Arc<PushServerState>) -> Result<(), PushServerError> {
    let cancel = state.cancel.clone();

    axum::serve(listener, router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| PushServerError::ServerFailed(e.to_string()))?;

    tracing::info!("Push server stopped");
    Ok(())
}

/// Build the push router.
#[must_use]
pub fn router(state: Arc<PushServerState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/stock-data", get(stock_data_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// WebSocket Handlers
// =============================================================================

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<PushServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Pump snapshots to one client until either side goes away.
async fn handle_socket(socket: WebSocket, state: Arc<PushServerState>) {
    let (connection, mut snapshots) =
        Connection::channel(state.broadcaster.config().channel_capacity);
    let id = connection.id();
    state.broadcaster.on_connect(connection);

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            () = state.cancel.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            snapshot = snapshots.recv() => {
                let Some(snapshot) = snapshot else { break };
                let frame = match snapshot.to_frame() {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::error!(connection_id = %id, kind = snapshot.kind().as_str(), error = %e, "Failed to encode snapshot");
                        continue;
                    }
                };
                if sender.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(connection_id = %id, error = %e, "WebSocket receive failed");
                    break;
                }
            },
        }
    }

    state.broadcaster.on_disconnect(id);
}

// =============================================================================
// Candle API
// =============================================================================

#[derive(Debug, Deserialize)]
struct StockDataParams {
    symbol: Option<String>,
    interval: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StockDataBody {
    candlestick_data: Vec<Candle>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

/// Trailing candles for one symbol.
///
/// Unknown intervals fall back to daily bars. A symbol without candles is a
/// 404; any other provider failure is a 500 carrying the error message.
async fn stock_data_handler(
    State(state): State<Arc<PushServerState>>,
    Query(params): Query<StockDataParams>,
) -> Response {
    let Some(symbol) = params
        .symbol
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    else {
        return error_response(StatusCode::BAD_REQUEST, MISSING_SYMBOL);
    };

    let interval = ChartInterval::parse_or_default(params.interval.as_deref());
    let request = CandleRequest::trailing(interval, Utc::now());

    match state.candles.candles(&symbol, &request).await {
        Ok(candles) => (
            StatusCode::OK,
            Json(StockDataBody {
                candlestick_data: candles,
            }),
        )
            .into_response(),
        Err(ProviderError::NotFound { .. }) => {
            tracing::debug!(symbol = %symbol, interval = %interval, "No candles for symbol");
            error_response(StatusCode::NOT_FOUND, NO_STOCK_DATA)
        }
        Err(e) => {
            tracing::warn!(symbol = %symbol, interval = %interval, error = %e, "Stock data request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Push server errors.
#[derive(Debug, thiserror::Error)]
pub enum PushServerError {
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

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use parking_lot::Mutex;
    use rust_decimal::Decimal;
    use tower::ServiceExt;

    use super::*;
    use crate::application::ports::{CandleProvider, QuoteProvider};
    use crate::application::services::BroadcasterConfig;
    use crate::domain::quote::ProviderQuote;

    #[derive(Default)]
    struct FixedCandles {
        requests: Mutex<Vec<CandleRequest>>,
    }

    #[async_trait]
    impl CandleProvider for FixedCandles {
        async fn candles(
            &self,
            symbol: &str,
            request: &CandleRequest,
        ) -> Result<Vec<Candle>, ProviderError> {
            self.requests.lock().push(*request);
            match symbol {
                "MISSING" => Err(ProviderError::NotFound {
                    symbol: symbol.to_string(),
                }),
                "FLAKY" => Err(ProviderError::Http { status: 502 }),
                _ => Ok(vec![Candle {
                    time: 1_700_000_000,
                    open: Decimal::new(24_950, 1),
                    high: Decimal::from(2510),
                    low: Decimal::from(2480),
                    close: Decimal::from(2500),
                }]),
            }
        }
    }

    struct OfflineQuotes;

    #[async_trait]
    impl QuoteProvider for OfflineQuotes {
        async fn quote(&self, symbol: &str) -> Result<ProviderQuote, ProviderError> {
            Err(ProviderError::NotFound {
                symbol: symbol.to_string(),
            })
        }
    }

    fn app(candles: Arc<FixedCandles>) -> Router {
        let broadcaster = Arc::new(SnapshotBroadcaster::new(
            BroadcasterConfig::default(),
            Arc::new(OfflineQuotes),
            Vec::new(),
        ));
        router(Arc::new(PushServerState::new(
            broadcaster,
            candles,
            CancellationToken::new(),
        )))
    }

    async fn get_json(candles: Arc<FixedCandles>, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app(candles)
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn stock_data_without_symbol_is_bad_request() {
        let candles = Arc::new(FixedCandles::default());

        let (status, json) = get_json(Arc::clone(&candles), "/api/stock-data").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], MISSING_SYMBOL);

        let (status, _) = get_json(Arc::clone(&candles), "/api/stock-data?symbol=%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(candles.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn stock_data_returns_candles() {
        let candles = Arc::new(FixedCandles::default());
        let (status, json) = get_json(
            Arc::clone(&candles),
            "/api/stock-data?symbol=RELIANCE.NS&interval=1wk",
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let bars = json["candlestickData"].as_array().unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0]["time"], 1_700_000_000);
        assert_eq!(bars[0]["open"], 2495.0);
        assert_eq!(bars[0]["close"], 2500.0);

        let requests = candles.requests.lock();
        assert_eq!(requests[0].interval, ChartInterval::OneWeek);
        assert!(requests[0].from < requests[0].to);
    }

    #[tokio::test]
    async fn unknown_interval_falls_back_to_daily() {
        let candles = Arc::new(FixedCandles::default());
        let (status, _) = get_json(
            Arc::clone(&candles),
            "/api/stock-data?symbol=AAPL&interval=4h",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(candles.requests.lock()[0].interval, ChartInterval::OneDay);
    }

    #[tokio::test]
    async fn stock_data_maps_provider_failures() {
        let candles = Arc::new(FixedCandles::default());

        let (status, json) = get_json(Arc::clone(&candles), "/api/stock-data?symbol=MISSING").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], NO_STOCK_DATA);

        let (status, json) = get_json(candles, "/api/stock-data?symbol=FLAKY").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("502"));
    }

    #[tokio::test]
    async fn websocket_route_requires_upgrade() {
        let response = app(Arc::new(FixedCandles::default()))
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn socket_io_handshake_is_not_served() {
        for uri in ["/socket.io/?EIO=4&transport=polling", "/socket.io", "/api/quote?symbol=AAPL"] {
            let response = app(Arc::new(FixedCandles::default()))
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }
}
