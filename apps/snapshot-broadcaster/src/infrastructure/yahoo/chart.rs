//! Yahoo Finance chart payload.
//!
//! Quotes read only the `meta` block of the v8 chart response. It carries
//! the current session price, previous close, currency and names. Candles
//! zip the `timestamp` array with the first `indicators.quote` series.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::ports::ProviderError;
use crate::domain::candle::Candle;
use crate::domain::quote::ProviderQuote;

#[derive(Debug, Deserialize)]
pub(super) struct ChartEnvelope {
    pub chart: ChartBody,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChartBody {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChartResult {
    #[serde(default)]
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    #[serde(default)]
    pub indicators: Option<ChartIndicators>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<ChartSeries>,
}

/// Per-bar price arrays; null entries mark bars without trades.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ChartSeries {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChartError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Session metadata for one symbol.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ChartMeta {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub regular_market_price: Option<f64>,
    #[serde(default)]
    pub chart_previous_close: Option<f64>,
    #[serde(default)]
    pub previous_close: Option<f64>,
    #[serde(default)]
    pub long_name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
}

impl ChartEnvelope {
    /// Extract the quote for `symbol`, or explain why there is none.
    pub fn into_quote(self, symbol: &str) -> Result<ProviderQuote, ProviderError> {
        self.into_result(symbol)
            .map(|result| meta_to_quote(symbol, result.meta))
    }

    /// Extract the candles for `symbol`.
    ///
    /// A chart without any bars is reported as `NotFound`.
    pub fn into_candles(self, symbol: &str) -> Result<Vec<Candle>, ProviderError> {
        let result = self.into_result(symbol)?;
        let series = result
            .indicators
            .and_then(|indicators| indicators.quote.into_iter().next())
            .unwrap_or_default();

        let candles: Vec<Candle> = result
            .timestamp
            .iter()
            .enumerate()
            .map(|(i, &time)| Candle {
                time,
                open: price_at(&series.open, i),
                high: price_at(&series.high, i),
                low: price_at(&series.low, i),
                close: price_at(&series.close, i),
            })
            .collect();

        if candles.is_empty() {
            return Err(ProviderError::NotFound {
                symbol: symbol.to_string(),
            });
        }
        Ok(candles)
    }

    fn into_result(self, symbol: &str) -> Result<ChartResult, ProviderError> {
        if let Some(error) = self.chart.error {
            tracing::debug!(
                symbol,
                code = error.code.as_deref().unwrap_or_default(),
                description = error.description.as_deref().unwrap_or_default(),
                "Chart API reported an error"
            );
            return Err(ProviderError::NotFound {
                symbol: symbol.to_string(),
            });
        }

        self.chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| ProviderError::NotFound {
                symbol: symbol.to_string(),
            })
    }
}

fn price_at(values: &[Option<f64>], index: usize) -> Decimal {
    values
        .get(index)
        .copied()
        .flatten()
        .and_then(to_decimal)
        .unwrap_or_default()
}

/// Convert chart metadata into a provider quote.
///
/// Change and percent change are derived from the previous close; both stay
/// empty when either price is missing or the previous close is zero.
pub(super) fn meta_to_quote(requested: &str, meta: ChartMeta) -> ProviderQuote {
    let price = meta.regular_market_price.and_then(to_decimal);
    let previous = meta
        .chart_previous_close
        .or(meta.previous_close)
        .and_then(to_decimal)
        .filter(|p| !p.is_zero());

    let (change, change_percent) = match (price, previous) {
        (Some(price), Some(previous)) => {
            let change = price - previous;
            let percent = change
                .checked_div(previous)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED));
            (Some(change), percent)
        }
        _ => (None, None),
    };

    ProviderQuote {
        symbol: meta.symbol.unwrap_or_else(|| requested.to_string()),
        regular_market_price: price,
        regular_market_change: change,
        regular_market_change_percent: change_percent,
        currency: meta.currency,
        display_name: meta.long_name,
        short_name: meta.short_name,
    }
}

fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::try_from(value).ok()
}
