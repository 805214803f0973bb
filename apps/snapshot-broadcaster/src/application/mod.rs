//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for external systems (quote provider).
pub mod ports;

/// Application services: broadcaster, fetch groups, upstream coalescing.
pub mod services;
