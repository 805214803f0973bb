//! Domain Layer - Core snapshot types and business rules.
//!
//! This layer contains the quote, candle, snapshot and connection types with no
//! I/O. All types here are pure Rust with serialization support.

/// OHLC candles and the interval whitelist.
pub mod candle;

/// Connection identity and lifecycle state.
pub mod connection;

/// Provider quotes and normalized quote records.
pub mod quote;

/// Snapshot kinds, payloads and wire frames.
pub mod snapshot;

/// Read-only symbol lists.
pub mod watchlist;
