//! Configuration Module
//!
//! Configuration loading for the snapshot broadcaster.

mod settings;

pub use settings::{AppConfig, ConfigError, PollSettings, ProviderSettings, ServerSettings};
