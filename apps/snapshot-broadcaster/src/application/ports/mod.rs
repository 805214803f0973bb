//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `QuoteProvider`: point-in-time quotes for a single symbol
//! - `CandleProvider`: historical candles for a single symbol
//! - `BroadcastObserver`: broadcaster lifecycle events (metrics sink)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::candle::{Candle, CandleRequest};
use crate::domain::quote::ProviderQuote;
use crate::domain::snapshot::SnapshotKind;

/// Quote provider error.
///
/// `Clone` so that a single upstream failure can be handed to every
/// coalesced waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Network or transport failure.
    #[error("quote provider transport error: {message}")]
    Transport {
        /// Error details.
        message: String,
    },

    /// Request exceeded the configured timeout.
    #[error("quote provider request timed out")]
    Timeout,

    /// Provider answered with a non-success status.
    #[error("quote provider returned HTTP {status}")]
    Http {
        /// HTTP status code.
        status: u16,
    },

    /// Provider has no data for the symbol.
    #[error("no quote found for symbol: {symbol}")]
    NotFound {
        /// The requested symbol.
        symbol: String,
    },

    /// Response body could not be decoded.
    #[error("malformed quote payload: {message}")]
    Decode {
        /// Error details.
        message: String,
    },
}

impl ProviderError {
    /// Short label for metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Timeout => "timeout",
            Self::Http { .. } => "http",
            Self::NotFound { .. } => "not_found",
            Self::Decode { .. } => "decode",
        }
    }
}

/// Port for fetching a point-in-time quote.
///
/// This is a driven (secondary/outbound) port. The infrastructure layer
/// provides implementations (e.g., the Yahoo Finance adapter).
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetch the latest quote for a symbol.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the provider fails, times out, or has no
    /// data for the symbol.
    async fn quote(&self, symbol: &str) -> Result<ProviderQuote, ProviderError>;
}

/// Shared quote provider reference.
pub type SharedQuoteProvider = Arc<dyn QuoteProvider>;

/// Port for fetching historical candles.
#[async_trait]
pub trait CandleProvider: Send + Sync {
    /// Fetch candles for a symbol over the requested window.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::NotFound` if the provider has no candles for
    /// the symbol, or any other variant if the request fails.
    async fn candles(
        &self,
        symbol: &str,
        request: &CandleRequest,
    ) -> Result<Vec<Candle>, ProviderError>;
}

/// Shared candle provider reference.
pub type SharedCandleProvider = Arc<dyn CandleProvider>;

/// Receives broadcaster events.
///
/// Every method defaults to a no-op so implementations only override what
/// they record.
pub trait BroadcastObserver: Send + Sync {
    /// Number of registered connections changed.
    fn connections_changed(&self, _count: usize) {}

    /// A snapshot was handed to a connection.
    fn snapshot_delivered(&self, _kind: SnapshotKind) {}

    /// A snapshot was produced for a connection that had gone away.
    fn snapshot_discarded(&self, _kind: SnapshotKind) {}

    /// A fetch group failed and its snapshot was skipped.
    fn group_failed(&self, _kind: SnapshotKind) {}

    /// A poll cycle settled.
    fn cycle_completed(&self, _elapsed: Duration) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BroadcastObserver for NoopObserver {}

/// Shared observer reference.
pub type SharedObserver = Arc<dyn BroadcastObserver>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_labels() {
        assert_eq!(ProviderError::Timeout.label(), "timeout");
        assert_eq!(ProviderError::Http { status: 503 }.label(), "http");
        assert_eq!(
            ProviderError::NotFound {
                symbol: "^NSEI".to_string()
            }
            .to_string(),
            "no quote found for symbol: ^NSEI"
        );
    }
}
