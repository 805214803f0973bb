//! Candle Types
//!
//! OHLC candles served to the chart view, and the interval whitelist that
//! guards which bar sizes may be requested upstream.

use std::fmt;

use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Years of history returned for a candle request.
pub const HISTORY_YEARS: u32 = 4;

/// Bar size accepted by the candle endpoint.
///
/// Anything outside the whitelist falls back to daily bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChartInterval {
    /// One day.
    #[default]
    OneDay,
    /// One minute.
    OneMinute,
    /// Two minutes.
    TwoMinutes,
    /// Five minutes.
    FiveMinutes,
    /// Fifteen minutes.
    FifteenMinutes,
    /// Thirty minutes.
    ThirtyMinutes,
    /// Sixty minutes.
    SixtyMinutes,
    /// Ninety minutes.
    NinetyMinutes,
    /// One hour.
    OneHour,
    /// Five days.
    FiveDays,
    /// One week.
    OneWeek,
    /// One month.
    OneMonth,
    /// Three months.
    ThreeMonths,
}

impl ChartInterval {
    /// Every accepted interval, in upstream notation.
    pub const ALL: [Self; 13] = [
        Self::OneDay,
        Self::OneMinute,
        Self::TwoMinutes,
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::ThirtyMinutes,
        Self::SixtyMinutes,
        Self::NinetyMinutes,
        Self::OneHour,
        Self::FiveDays,
        Self::OneWeek,
        Self::OneMonth,
        Self::ThreeMonths,
    ];

    /// Upstream notation, e.g. `"15m"` or `"1wk"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::OneMinute => "1m",
            Self::TwoMinutes => "2m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::SixtyMinutes => "60m",
            Self::NinetyMinutes => "90m",
            Self::OneHour => "1h",
            Self::FiveDays => "5d",
            Self::OneWeek => "1wk",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
        }
    }

    /// Parse a requested interval, falling back to daily bars when it is
    /// missing or not whitelisted.
    #[must_use]
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value
            .and_then(|v| Self::ALL.into_iter().find(|i| i.as_str() == v))
            .unwrap_or_default()
    }
}

impl fmt::Display for ChartInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interval and time window for one candle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandleRequest {
    /// Bar size.
    pub interval: ChartInterval,
    /// Window start.
    pub from: DateTime<Utc>,
    /// Window end.
    pub to: DateTime<Utc>,
}

impl CandleRequest {
    /// Request the trailing `HISTORY_YEARS` of candles ending at `now`.
    #[must_use]
    pub fn trailing(interval: ChartInterval, now: DateTime<Utc>) -> Self {
        let from = now
            .checked_sub_months(Months::new(HISTORY_YEARS * 12))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self {
            interval,
            from,
            to: now,
        }
    }
}

/// One OHLC bar.
///
/// `time` is a UNIX timestamp in seconds. Missing prices are zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candle {
    /// Bar open time, UNIX seconds.
    pub time: i64,
    /// Opening price.
    #[serde(with = "rust_decimal::serde::float")]
    pub open: Decimal,
    /// Highest price.
    #[serde(with = "rust_decimal::serde::float")]
    pub high: Decimal,
    /// Lowest price.
    #[serde(with = "rust_decimal::serde::float")]
    pub low: Decimal,
    /// Closing price.
    #[serde(with = "rust_decimal::serde::float")]
    pub close: Decimal,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use test_case::test_case;

    use super::*;

    #[test_case(Some("15m"), ChartInterval::FifteenMinutes ; "whitelisted minutes")]
    #[test_case(Some("1wk"), ChartInterval::OneWeek ; "whitelisted week")]
    #[test_case(Some("3mo"), ChartInterval::ThreeMonths ; "whitelisted quarter")]
    #[test_case(Some("4h"), ChartInterval::OneDay ; "unknown falls back")]
    #[test_case(Some(""), ChartInterval::OneDay ; "empty falls back")]
    #[test_case(None, ChartInterval::OneDay ; "missing falls back")]
    fn interval_parsing(input: Option<&str>, expected: ChartInterval) {
        assert_eq!(ChartInterval::parse_or_default(input), expected);
    }

    #[test]
    fn every_interval_round_trips_through_its_notation() {
        for interval in ChartInterval::ALL {
            assert_eq!(
                ChartInterval::parse_or_default(Some(interval.as_str())),
                interval
            );
        }
    }

    #[test]
    fn trailing_window_spans_four_years() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let request = CandleRequest::trailing(ChartInterval::OneDay, now);
        assert_eq!(request.to, now);
        assert_eq!(
            request.from,
            Utc.with_ymd_and_hms(2022, 3, 15, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn candle_serializes_prices_as_numbers() {
        let candle = Candle {
            time: 1_700_000_000,
            open: Decimal::new(1005, 1),
            high: Decimal::from(101),
            low: Decimal::from(99),
            close: Decimal::ZERO,
        };
        let json = serde_json::to_value(&candle).unwrap();
        assert_eq!(json["time"], 1_700_000_000);
        assert_eq!(json["open"], 100.5);
        assert_eq!(json["close"], 0.0);
    }
}
