//! Quote Types
//!
//! The raw point-in-time quote returned by a provider and the normalized
//! record pushed to dashboard clients.
//!
//! # Normalization
//!
//! Every field a provider may omit has a default so that a missing or
//! failed quote still renders:
//!
//! - price and change default to `0`
//! - percent change is rendered with two decimals, or `"0"` when absent
//! - currency falls back to a configured code

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Name used for listed records when the provider has no display name.
pub const UNKNOWN_NAME: &str = "N/A";

// =============================================================================
// Provider Quote
// =============================================================================

/// A point-in-time quote as returned by the upstream provider.
///
/// All market fields are optional: providers routinely omit them for
/// thinly traded or delayed instruments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderQuote {
    /// Provider symbol (e.g. `^NSEI`).
    pub symbol: String,
    /// Last traded price.
    pub regular_market_price: Option<Decimal>,
    /// Absolute change since previous close.
    pub regular_market_change: Option<Decimal>,
    /// Percent change since previous close.
    pub regular_market_change_percent: Option<Decimal>,
    /// ISO currency code.
    pub currency: Option<String>,
    /// Long, human-friendly name.
    pub display_name: Option<String>,
    /// Short exchange name.
    pub short_name: Option<String>,
}

impl ProviderQuote {
    /// Create an empty quote for a symbol.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    /// Best available name: display name, then short name.
    #[must_use]
    pub fn best_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| self.short_name.as_deref().filter(|name| !name.is_empty()))
    }
}

// =============================================================================
// Quote Record
// =============================================================================

/// Normalized quote record delivered inside snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    /// Display name.
    pub name: String,
    /// Last price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Absolute change.
    #[serde(with = "rust_decimal::serde::float")]
    pub change: Decimal,
    /// Percent change, two decimals.
    pub change_percent: String,
    /// Currency code (listed records only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl QuoteRecord {
    /// Build a record under a configured series name.
    ///
    /// A missing quote yields a zero-valued record.
    #[must_use]
    pub fn named(name: impl Into<String>, quote: Option<&ProviderQuote>) -> Self {
        Self {
            name: name.into(),
            price: quote
                .and_then(|q| q.regular_market_price)
                .unwrap_or_default(),
            change: quote
                .and_then(|q| q.regular_market_change)
                .unwrap_or_default(),
            change_percent: format_change_percent(
                quote.and_then(|q| q.regular_market_change_percent),
            ),
            currency: None,
        }
    }

    /// Build a record named by the provider, carrying a currency.
    #[must_use]
    pub fn listed(quote: Option<&ProviderQuote>, fallback_currency: &str) -> Self {
        let name = quote
            .and_then(ProviderQuote::best_name)
            .unwrap_or(UNKNOWN_NAME)
            .to_string();

        let currency = quote
            .and_then(|q| q.currency.clone())
            .unwrap_or_else(|| fallback_currency.to_string());

        Self {
            currency: Some(currency),
            ..Self::named(name, quote)
        }
    }

    /// Zero-valued record for a series whose quote could not be fetched.
    #[must_use]
    pub fn zero(name: impl Into<String>) -> Self {
        Self::named(name, None)
    }

    /// Whether every numeric field is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.price.is_zero() && self.change.is_zero() && self.change_percent == "0"
    }
}

/// Render a percent change with exactly two decimals, or `"0"` when absent.
#[must_use]
pub fn format_change_percent(value: Option<Decimal>) -> String {
    value.map_or_else(
        || "0".to_string(),
        |v| {
            let rounded = v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            format!("{rounded:.2}")
        },
    )
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use test_case::test_case;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn nifty() -> ProviderQuote {
        ProviderQuote {
            symbol: "^NSEI".to_string(),
            regular_market_price: Some(dec("22514.65")),
            regular_market_change: Some(dec("-41.3")),
            regular_market_change_percent: Some(dec("-0.18312")),
            currency: Some("INR".to_string()),
            display_name: None,
            short_name: Some("NIFTY 50".to_string()),
        }
    }

    #[test_case(Some("1.2"), "1.20" ; "pads to two decimals")]
    #[test_case(Some("0.125"), "0.13" ; "rounds midpoint away from zero")]
    #[test_case(Some("-0.125"), "-0.13" ; "rounds negative midpoint away from zero")]
    #[test_case(Some("3"), "3.00" ; "whole number")]
    #[test_case(None, "0" ; "absent")]
    fn change_percent_formatting(input: Option<&str>, expected: &str) {
        assert_eq!(format_change_percent(input.map(dec)), expected);
    }

    #[test]
    fn named_record_uses_series_name() {
        let record = QuoteRecord::named("NIFTY 50", Some(&nifty()));
        assert_eq!(record.name, "NIFTY 50");
        assert_eq!(record.price, dec("22514.65"));
        assert_eq!(record.change, dec("-41.3"));
        assert_eq!(record.change_percent, "-0.18");
        assert_eq!(record.currency, None);
    }

    #[test]
    fn missing_quote_yields_zero_record() {
        let record = QuoteRecord::named("SENSEX", None);
        assert!(record.is_zero());
        assert_eq!(record.name, "SENSEX");
    }

    #[test]
    fn listed_record_prefers_display_name() {
        let mut quote = nifty();
        quote.display_name = Some("Nifty Fifty".to_string());
        let record = QuoteRecord::listed(Some(&quote), "USD");
        assert_eq!(record.name, "Nifty Fifty");
        assert_eq!(record.currency.as_deref(), Some("INR"));
    }

    #[test]
    fn listed_record_falls_back_to_short_name_and_currency() {
        let mut quote = nifty();
        quote.currency = None;
        let record = QuoteRecord::listed(Some(&quote), "INR");
        assert_eq!(record.name, "NIFTY 50");
        assert_eq!(record.currency.as_deref(), Some("INR"));
    }

    #[test]
    fn listed_record_without_quote() {
        let record = QuoteRecord::listed(None, "INR");
        assert_eq!(record.name, UNKNOWN_NAME);
        assert_eq!(record.currency.as_deref(), Some("INR"));
        assert!(record.is_zero());
    }

    #[test]
    fn empty_display_name_is_skipped() {
        let mut quote = nifty();
        quote.display_name = Some(String::new());
        assert_eq!(quote.best_name(), Some("NIFTY 50"));
    }

    #[test]
    fn record_serializes_numbers_as_json_numbers() {
        let json = serde_json::to_value(QuoteRecord::named("NIFTY 50", Some(&nifty()))).unwrap();
        assert!((json["price"].as_f64().unwrap() - 22514.65).abs() < 1e-9);
        assert!((json["change"].as_f64().unwrap() + 41.3).abs() < 1e-9);
        assert_eq!(json["changePercent"], "-0.18");
        assert!(json.get("currency").is_none());
    }
}
