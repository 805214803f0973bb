//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `SnapshotBroadcaster`: per-connection poll loops and delivery
//! - `FetchGroup`: builds one snapshot kind from concurrent provider calls
//! - `SingleFlightProvider`: coalesces concurrent identical upstream calls

pub mod broadcaster;
pub mod fetch_groups;
pub mod single_flight;

pub use broadcaster::{
    BroadcasterConfig, BroadcasterStats, Connection, DeliveryError, SnapshotBroadcaster,
    SnapshotReceiver,
};
pub use fetch_groups::{CountryIndicesGroup, DashboardGroup, FetchGroup, GroupError};
pub use single_flight::SingleFlightProvider;
