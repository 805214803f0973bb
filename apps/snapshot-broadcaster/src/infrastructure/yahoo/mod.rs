//! Yahoo Finance Adapter
//!
//! Implements the `QuoteProvider` port over the public Yahoo Finance chart
//! endpoint:
//!
//! ```text
//! GET {base}/v8/finance/chart/{symbol}?range=1d&interval=1d
//! ```
//!
//! # Error Mapping
//!
//! | Upstream                          | `ProviderError` |
//! |-----------------------------------|-----------------|
//! | request timed out                 | `Timeout`       |
//! | connect / IO failure              | `Transport`     |
//! | HTTP 404, chart error, no result  | `NotFound`      |
//! | other non-2xx status              | `Http`          |
//! | body is not a chart envelope      | `Decode`        |

mod chart;
mod client;

pub use client::YahooQuoteProvider;
