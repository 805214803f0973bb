//! Fetch Groups
//!
//! A fetch group is a named set of provider calls executed together to build
//! one snapshot. Every call in a group is issued concurrently and the group
//! resolves once the slowest call has settled.
//!
//! A failed call never aborts its group: the series is filled with a
//! zero-valued record instead, even when every call in the group failed.
//! Group-level errors are reserved for groups that cannot issue any call.

use async_trait::async_trait;
use futures::future::join_all;
use rust_decimal::Decimal;

use crate::application::ports::QuoteProvider;
use crate::domain::quote::{ProviderQuote, QuoteRecord};
use crate::domain::snapshot::{
    CountryIndicesSnapshot, DashboardSnapshot, SeriesMap, SnapshotKind, SnapshotPayload,
};
use crate::domain::watchlist::{
    CountrySeries, IndexSeries, Mover, default_country_indices, default_dashboard_indices,
    default_movers,
};

/// Maximum gainers and losers listed on the dashboard.
pub const DEFAULT_MOVERS_LIMIT: usize = 3;

/// Fallback currency for listed records without one.
pub const DEFAULT_FALLBACK_CURRENCY: &str = "INR";

// =============================================================================
// Errors
// =============================================================================

/// Group-level failure; the snapshot kind is skipped for the cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupError {
    /// No series configured for the group.
    #[error("{kind} group has no series configured")]
    EmptyWatchlist {
        /// Snapshot kind.
        kind: SnapshotKind,
    },
}

// =============================================================================
// Fetch Group Trait
// =============================================================================

/// Builds one snapshot payload from concurrent provider calls.
#[async_trait]
pub trait FetchGroup: Send + Sync {
    /// Kind of snapshot this group produces.
    fn kind(&self) -> SnapshotKind;

    /// Run every call in the group and assemble the payload.
    ///
    /// # Errors
    ///
    /// Returns `GroupError` when the group has nothing to fetch. Failed
    /// provider calls are zero-filled and never surface here.
    async fn fetch(&self, provider: &dyn QuoteProvider) -> Result<SnapshotPayload, GroupError>;
}

/// Fetch quotes for all symbols concurrently, substituting `None` for failures.
async fn fetch_quotes(provider: &dyn QuoteProvider, symbols: &[&str]) -> Vec<Option<ProviderQuote>> {
    join_all(symbols.iter().map(|&symbol| async move {
        match provider.quote(symbol).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Quote fetch failed, substituting zero record");
                None
            }
        }
    }))
    .await
}

// =============================================================================
// Dashboard Group
// =============================================================================

/// Headline indices plus gainers and losers from a movers universe.
#[derive(Debug, Clone)]
pub struct DashboardGroup {
    indices: Vec<IndexSeries>,
    movers: Vec<Mover>,
    movers_limit: usize,
}

impl DashboardGroup {
    /// Create a dashboard group.
    #[must_use]
    pub const fn new(indices: Vec<IndexSeries>, movers: Vec<Mover>) -> Self {
        Self {
            indices,
            movers,
            movers_limit: DEFAULT_MOVERS_LIMIT,
        }
    }

    /// Create a dashboard group with the default watchlists.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(default_dashboard_indices(), default_movers())
    }

    /// Set how many gainers and losers are listed.
    #[must_use]
    pub const fn with_movers_limit(mut self, limit: usize) -> Self {
        self.movers_limit = limit;
        self
    }
}

#[async_trait]
impl FetchGroup for DashboardGroup {
    fn kind(&self) -> SnapshotKind {
        SnapshotKind::Dashboard
    }

    async fn fetch(&self, provider: &dyn QuoteProvider) -> Result<SnapshotPayload, GroupError> {
        if self.indices.is_empty() {
            return Err(GroupError::EmptyWatchlist { kind: self.kind() });
        }

        let index_symbols: Vec<&str> = self.indices.iter().map(|s| s.symbol.as_str()).collect();
        let mover_symbols: Vec<&str> = self.movers.iter().map(|m| m.symbol.as_str()).collect();

        let (index_quotes, mover_quotes) = futures::join!(
            fetch_quotes(provider, &index_symbols),
            fetch_quotes(provider, &mover_symbols)
        );

        let indices: SeriesMap<QuoteRecord> = self
            .indices
            .iter()
            .zip(&index_quotes)
            .map(|(series, quote)| {
                (
                    series.key.clone(),
                    QuoteRecord::named(series.name.clone(), quote.as_ref()),
                )
            })
            .collect();

        let (gainers, losers) = rank_movers(&self.movers, &mover_quotes, self.movers_limit);

        Ok(SnapshotPayload::Dashboard(DashboardSnapshot {
            indices,
            gainers,
            losers,
        }))
    }
}

/// Rank movers by percent change.
///
/// Gainers are positive movers, strongest first; losers are negative movers,
/// weakest first. Movers without a quote or a percent change are skipped.
fn rank_movers(
    movers: &[Mover],
    quotes: &[Option<ProviderQuote>],
    limit: usize,
) -> (Vec<String>, Vec<String>) {
    let mut ranked: Vec<(&str, Decimal)> = movers
        .iter()
        .zip(quotes)
        .filter_map(|(mover, quote)| {
            let pct = quote.as_ref()?.regular_market_change_percent?;
            Some((mover.name.as_str(), pct))
        })
        .collect();

    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let gainers = ranked
        .iter()
        .filter(|(_, pct)| *pct > Decimal::ZERO)
        .take(limit)
        .map(|(name, _)| (*name).to_string())
        .collect();

    let losers = ranked
        .iter()
        .rev()
        .filter(|(_, pct)| *pct < Decimal::ZERO)
        .take(limit)
        .map(|(name, _)| (*name).to_string())
        .collect();

    (gainers, losers)
}

// =============================================================================
// Country Indices Group
// =============================================================================

/// Benchmark indices grouped by country.
#[derive(Debug, Clone)]
pub struct CountryIndicesGroup {
    countries: Vec<CountrySeries>,
    fallback_currency: String,
}

impl CountryIndicesGroup {
    /// Create a country indices group.
    #[must_use]
    pub fn new(countries: Vec<CountrySeries>, fallback_currency: impl Into<String>) -> Self {
        Self {
            countries,
            fallback_currency: fallback_currency.into(),
        }
    }

    /// Create a country indices group with the default watchlist.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(default_country_indices(), DEFAULT_FALLBACK_CURRENCY)
    }
}

#[async_trait]
impl FetchGroup for CountryIndicesGroup {
    fn kind(&self) -> SnapshotKind {
        SnapshotKind::CountryIndices
    }

    async fn fetch(&self, provider: &dyn QuoteProvider) -> Result<SnapshotPayload, GroupError> {
        if self.countries.iter().all(|c| c.symbols.is_empty()) {
            return Err(GroupError::EmptyWatchlist { kind: self.kind() });
        }

        let per_country = join_all(self.countries.iter().map(|country| async move {
            let symbols: Vec<&str> = country.symbols.iter().map(String::as_str).collect();
            fetch_quotes(provider, &symbols).await
        }))
        .await;

        let countries: CountryIndicesSnapshot = self
            .countries
            .iter()
            .zip(per_country)
            .map(|(country, quotes)| {
                let records = quotes
                    .iter()
                    .map(|quote| QuoteRecord::listed(quote.as_ref(), &self.fallback_currency))
                    .collect();
                (country.key.clone(), records)
            })
            .collect();

        Ok(SnapshotPayload::CountryIndices(countries))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::application::ports::ProviderError;

    struct StubProvider {
        quotes: HashMap<String, ProviderQuote>,
    }

    impl StubProvider {
        fn with(quotes: impl IntoIterator<Item = ProviderQuote>) -> Self {
            Self {
                quotes: quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect(),
            }
        }
    }

    #[async_trait]
    impl QuoteProvider for StubProvider {
        async fn quote(&self, symbol: &str) -> Result<ProviderQuote, ProviderError> {
            self.quotes
                .get(symbol)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound {
                    symbol: symbol.to_string(),
                })
        }
    }

    fn quote(symbol: &str, price: i64, pct: Decimal) -> ProviderQuote {
        ProviderQuote {
            symbol: symbol.to_string(),
            regular_market_price: Some(Decimal::from(price)),
            regular_market_change: Some(Decimal::ONE),
            regular_market_change_percent: Some(pct),
            currency: Some("USD".to_string()),
            display_name: None,
            short_name: Some(format!("{symbol} index")),
        }
    }

    fn unwrap_dashboard(payload: SnapshotPayload) -> DashboardSnapshot {
        match payload {
            SnapshotPayload::Dashboard(d) => d,
            SnapshotPayload::CountryIndices(_) => panic!("expected dashboard payload"),
        }
    }

    fn unwrap_countries(payload: SnapshotPayload) -> CountryIndicesSnapshot {
        match payload {
            SnapshotPayload::CountryIndices(c) => c,
            SnapshotPayload::Dashboard(_) => panic!("expected country payload"),
        }
    }

    #[tokio::test]
    async fn dashboard_zero_fills_failed_index() {
        let provider = StubProvider::with(
            default_dashboard_indices()
                .iter()
                .filter(|s| s.symbol != "^NSEI")
                .map(|s| quote(&s.symbol, 100, Decimal::ONE)),
        );
        let group = DashboardGroup::new(default_dashboard_indices(), vec![]);

        let dashboard = unwrap_dashboard(group.fetch(&provider).await.unwrap());

        assert_eq!(dashboard.indices.len(), 9);
        let zeroed: Vec<_> = dashboard
            .indices
            .iter()
            .filter(|(_, r)| r.is_zero())
            .map(|(k, _)| k)
            .collect();
        assert_eq!(zeroed, vec!["nifty50"]);
        assert_eq!(dashboard.indices.get("nifty50").unwrap().name, "NIFTY 50");
        assert_eq!(
            dashboard.indices.get("sensex").unwrap().price,
            Decimal::from(100)
        );
    }

    #[tokio::test]
    async fn dashboard_with_every_call_failing_is_zero_filled() {
        let provider = StubProvider::with([]);
        let group = DashboardGroup::with_defaults();

        let dashboard = unwrap_dashboard(group.fetch(&provider).await.unwrap());

        assert_eq!(dashboard.indices.len(), 9);
        assert!(dashboard.indices.iter().all(|(_, r)| r.is_zero()));
        assert_eq!(dashboard.indices.get("nifty50").unwrap().name, "NIFTY 50");
        assert!(dashboard.gainers.is_empty());
        assert!(dashboard.losers.is_empty());
    }

    #[tokio::test]
    async fn empty_watchlist_is_rejected() {
        let provider = StubProvider::with([]);
        let group = DashboardGroup::new(vec![], default_movers());
        assert!(matches!(
            group.fetch(&provider).await,
            Err(GroupError::EmptyWatchlist { .. })
        ));

        let group = CountryIndicesGroup::new(vec![], "INR");
        assert!(matches!(
            group.fetch(&provider).await,
            Err(GroupError::EmptyWatchlist { .. })
        ));
    }

    #[tokio::test]
    async fn dashboard_ranks_movers() {
        let movers = vec![
            Mover::new("Alpha", "A"),
            Mover::new("Bravo", "B"),
            Mover::new("Charlie", "C"),
            Mover::new("Delta", "D"),
            Mover::new("Echo", "E"),
        ];
        let provider = StubProvider::with([
            quote("IDX", 1, Decimal::ZERO),
            quote("A", 1, Decimal::new(25, 1)),
            quote("B", 1, Decimal::new(-10, 1)),
            quote("C", 1, Decimal::new(40, 1)),
            quote("D", 1, Decimal::new(-35, 1)),
            // E fails and is excluded
        ]);
        let group = DashboardGroup::new(vec![IndexSeries::new("idx", "IDX", "IDX")], movers)
            .with_movers_limit(2);

        let dashboard = unwrap_dashboard(group.fetch(&provider).await.unwrap());

        assert_eq!(dashboard.gainers, vec!["Charlie", "Alpha"]);
        assert_eq!(dashboard.losers, vec!["Delta", "Bravo"]);
    }

    #[test]
    fn flat_movers_are_neither_gainers_nor_losers() {
        let movers = vec![Mover::new("Flat", "F")];
        let quotes = vec![Some(quote("F", 1, Decimal::ZERO))];
        let (gainers, losers) = rank_movers(&movers, &quotes, 3);
        assert!(gainers.is_empty());
        assert!(losers.is_empty());
    }

    #[tokio::test]
    async fn country_group_keeps_order_and_zero_fills() {
        let provider = StubProvider::with([
            quote("^GSPC", 5000, Decimal::ONE),
            quote("^FTSE", 8000, Decimal::ONE),
        ]);
        let group = CountryIndicesGroup::new(
            vec![
                CountrySeries::new("us", &["^GSPC", "^DJI"]),
                CountrySeries::new("uk", &["^FTSE"]),
            ],
            "INR",
        );

        let countries = unwrap_countries(group.fetch(&provider).await.unwrap());

        assert_eq!(countries.keys().collect::<Vec<_>>(), vec!["us", "uk"]);
        let us = countries.get("us").unwrap();
        assert_eq!(us.len(), 2);
        assert_eq!(us[0].name, "^GSPC index");
        assert_eq!(us[0].currency.as_deref(), Some("USD"));
        assert!(us[1].is_zero());
        assert_eq!(us[1].name, "N/A");
        assert_eq!(us[1].currency.as_deref(), Some("INR"));
    }

    #[tokio::test]
    async fn country_group_with_every_call_failing_is_zero_filled() {
        let provider = StubProvider::with([]);
        let countries = unwrap_countries(
            CountryIndicesGroup::with_defaults()
                .fetch(&provider)
                .await
                .unwrap(),
        );

        assert_eq!(countries.len(), 6);
        for (_, records) in countries.iter() {
            assert!(!records.is_empty());
            for record in records {
                assert!(record.is_zero());
                assert_eq!(record.name, "N/A");
                assert_eq!(record.currency.as_deref(), Some("INR"));
            }
        }
    }

    #[tokio::test]
    async fn country_group_without_symbols_is_a_group_error() {
        let provider = StubProvider::with([]);
        let group = CountryIndicesGroup::new(vec![CountrySeries::new("us", &[])], "INR");
        assert_eq!(
            group.fetch(&provider).await.unwrap_err(),
            GroupError::EmptyWatchlist {
                kind: SnapshotKind::CountryIndices
            }
        );
    }
}
