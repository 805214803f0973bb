//! Single-Flight Upstream Coalescing
//!
//! Every connection polls independently, so at any moment many connections
//! may ask for the same symbol. `SingleFlightProvider` guarantees at most one
//! in-flight upstream call per symbol: later callers attach to the pending
//! call and all of them receive the same resolved value.
//!
//! Nothing is retained once a call settles. The next request after
//! settlement always goes upstream again.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;

use crate::application::ports::{ProviderError, QuoteProvider, SharedQuoteProvider};
use crate::domain::quote::ProviderQuote;

type PendingQuote = Shared<BoxFuture<'static, Result<ProviderQuote, ProviderError>>>;
type InFlight = Arc<Mutex<HashMap<String, PendingQuote>>>;

/// Quote provider decorator that de-duplicates concurrent calls per symbol.
pub struct SingleFlightProvider {
    inner: SharedQuoteProvider,
    in_flight: InFlight,
}

impl SingleFlightProvider {
    /// Wrap a provider.
    #[must_use]
    pub fn new(inner: SharedQuoteProvider) -> Self {
        Self {
            inner,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of symbols with a call currently in flight.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    fn pending(&self, symbol: &str) -> PendingQuote {
        let mut in_flight = self.in_flight.lock();
        if let Some(pending) = in_flight.get(symbol) {
            tracing::trace!(symbol, "Joining in-flight quote request");
            return pending.clone();
        }

        let inner = Arc::clone(&self.inner);
        let table = Arc::clone(&self.in_flight);
        let owned = symbol.to_string();
        let pending = async move {
            let result = inner.quote(&owned).await;
            table.lock().remove(&owned);
            result
        }
        .boxed()
        .shared();

        in_flight.insert(symbol.to_string(), pending.clone());
        pending
    }
}

impl std::fmt::Debug for SingleFlightProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlightProvider")
            .field("in_flight", &self.in_flight_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl QuoteProvider for SingleFlightProvider {
    async fn quote(&self, symbol: &str) -> Result<ProviderQuote, ProviderError> {
        self.pending(symbol).await
    }
}

// =============================================================================
// Tests
// =============================================================================
