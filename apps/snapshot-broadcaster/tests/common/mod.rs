//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use snapshot_broadcaster::domain::watchlist::{
    default_country_indices, default_dashboard_indices, default_movers,
};
use snapshot_broadcaster::{
    BroadcasterConfig, Candle, CandleProvider, CandleRequest, CountryIndicesGroup,
    DashboardGroup, FetchGroup, GroupError, ProviderError, ProviderQuote, QuoteProvider,
    SnapshotBroadcaster, SnapshotKind, SnapshotPayload,
};

/// Scriptable quote provider.
///
/// Every symbol resolves to a quote with price 100 and +1% change unless it
/// is marked as failing. Calls are counted per symbol, along with the peak
/// number of concurrent calls for each symbol.
#[derive(Default)]
pub struct FakeProvider {
    failing: HashSet<String>,
    delay: Duration,
    symbol_delays: HashMap<String, Duration>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: Mutex<HashMap<String, usize>>,
    peak_in_flight: Mutex<HashMap<String, usize>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing.extend(symbols.into_iter().map(Into::into));
        self
    }

    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay only `symbols`, overriding the global delay for them.
    pub fn with_symbol_delay<I, S>(mut self, symbols: I, delay: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbol_delays
            .extend(symbols.into_iter().map(|s| (s.into(), delay)));
        self
    }

    pub fn calls(&self, symbol: &str) -> usize {
        self.calls.lock().get(symbol).copied().unwrap_or(0)
    }

    pub fn peak_in_flight(&self, symbol: &str) -> usize {
        self.peak_in_flight.lock().get(symbol).copied().unwrap_or(0)
    }
}

struct InFlightGuard<'a> {
    provider: &'a FakeProvider,
    symbol: &'a str,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(n) = self.provider.in_flight.lock().get_mut(self.symbol) {
            *n -= 1;
        }
    }
}

#[async_trait]
impl QuoteProvider for FakeProvider {
    async fn quote(&self, symbol: &str) -> Result<ProviderQuote, ProviderError> {
        *self.calls.lock().entry(symbol.to_string()).or_default() += 1;

        let current = {
            let mut in_flight = self.in_flight.lock();
            let n = in_flight.entry(symbol.to_string()).or_default();
            *n += 1;
            *n
        };
        {
            let mut peak = self.peak_in_flight.lock();
            let p = peak.entry(symbol.to_string()).or_default();
            *p = (*p).max(current);
        }
        let _guard = InFlightGuard {
            provider: self,
            symbol,
        };

        let delay = self.symbol_delays.get(symbol).copied().unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(symbol) {
            return Err(ProviderError::Transport {
                message: format!("{symbol} unavailable"),
            });
        }

        let mut quote = ProviderQuote::new(symbol);
        quote.regular_market_price = Some(Decimal::from(100));
        quote.regular_market_change = Some(Decimal::ONE);
        quote.regular_market_change_percent = Some(Decimal::ONE);
        quote.currency = Some("USD".to_string());
        quote.short_name = Some(format!("{symbol} index"));
        Ok(quote)
    }
}

/// One daily candle per request, unless the symbol is marked as failing.
#[async_trait]
impl CandleProvider for FakeProvider {
    async fn candles(
        &self,
        symbol: &str,
        request: &CandleRequest,
    ) -> Result<Vec<Candle>, ProviderError> {
        if self.failing.contains(symbol) {
            return Err(ProviderError::NotFound {
                symbol: symbol.to_string(),
            });
        }
        Ok(vec![Candle {
            time: request.to.timestamp(),
            open: Decimal::from(99),
            high: Decimal::from(101),
            low: Decimal::from(98),
            close: Decimal::from(100),
        }])
    }
}

/// Every symbol in the default country watchlist.
pub fn country_symbols() -> Vec<String> {
    default_country_indices()
        .into_iter()
        .flat_map(|c| c.symbols)
        .collect()
}

/// Every symbol the default dashboard group fetches: indices and movers.
pub fn dashboard_symbols() -> Vec<String> {
    default_dashboard_indices()
        .into_iter()
        .map(|s| s.symbol)
        .chain(default_movers().into_iter().map(|m| m.symbol))
        .collect()
}

/// Country symbols that the dashboard group never fetches.
pub fn country_only_symbols() -> Vec<String> {
    let dashboard: HashSet<String> = dashboard_symbols().into_iter().collect();
    country_symbols()
        .into_iter()
        .filter(|s| !dashboard.contains(s))
        .collect()
}

/// Group that fails at the group level for its first `failures` fetches,
/// then delegates to `inner`.
pub struct FlakyGroup<G> {
    inner: G,
    failures: usize,
    fetches: AtomicUsize,
}

impl<G> FlakyGroup<G> {
    pub const fn new(inner: G, failures: usize) -> Self {
        Self {
            inner,
            failures,
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl<G: FetchGroup> FetchGroup for FlakyGroup<G> {
    fn kind(&self) -> SnapshotKind {
        self.inner.kind()
    }

    async fn fetch(&self, provider: &dyn QuoteProvider) -> Result<SnapshotPayload, GroupError> {
        if self.fetches.fetch_add(1, Ordering::Relaxed) < self.failures {
            return Err(GroupError::EmptyWatchlist { kind: self.kind() });
        }
        self.inner.fetch(provider).await
    }
}

/// Broadcaster with both default fetch groups.
pub fn broadcaster(provider: Arc<FakeProvider>, poll_interval: Duration) -> Arc<SnapshotBroadcaster> {
    let groups: Vec<Arc<dyn FetchGroup>> = vec![
        Arc::new(DashboardGroup::with_defaults()),
        Arc::new(CountryIndicesGroup::with_defaults()),
    ];
    broadcaster_with_groups(provider, poll_interval, groups)
}

/// Broadcaster with custom fetch groups.
pub fn broadcaster_with_groups(
    provider: Arc<FakeProvider>,
    poll_interval: Duration,
    groups: Vec<Arc<dyn FetchGroup>>,
) -> Arc<SnapshotBroadcaster> {
    Arc::new(SnapshotBroadcaster::new(
        BroadcasterConfig {
            poll_interval,
            channel_capacity: 16,
        },
        provider,
        groups,
    ))
}
