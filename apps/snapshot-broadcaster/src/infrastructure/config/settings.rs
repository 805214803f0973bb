//! Broadcaster Configuration Settings
//!
//! Configuration types for the snapshot broadcaster, loaded from environment
//! variables. Unparseable values fall back to defaults; values that parse but
//! cannot work (a zero interval, a zero-capacity queue) are rejected.

use std::time::Duration;

use crate::application::services::BroadcasterConfig;
use crate::application::services::fetch_groups::DEFAULT_FALLBACK_CURRENCY;

/// Server port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Push server port (WebSocket and stock-data API).
    pub port: u16,
    /// Health check HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 4000,
            health_port: 8083,
        }
    }
}

/// Polling loop settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between a settled cycle and the next one.
    pub interval: Duration,
    /// Outbound queue capacity per connection.
    pub channel_capacity: usize,
    /// Currency reported for country indices that omit one.
    pub fallback_currency: String,
    /// Share concurrent identical upstream calls across connections.
    pub coalesce_upstream: bool,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            channel_capacity: 16,
            fallback_currency: DEFAULT_FALLBACK_CURRENCY.to_string(),
            coalesce_upstream: true,
        }
    }
}

impl From<&PollSettings> for BroadcasterConfig {
    fn from(settings: &PollSettings) -> Self {
        Self {
            poll_interval: settings.interval,
            channel_capacity: settings.channel_capacity,
        }
    }
}

/// Upstream quote provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    /// Base URL of the Yahoo Finance API.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout: Duration::from_millis(5000),
        }
    }
}

/// Complete broadcaster configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// Server port settings.
    pub server: ServerSettings,
    /// Polling loop settings.
    pub poll: PollSettings,
    /// Upstream provider settings.
    pub provider: ProviderSettings,
}

impl AppConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds a value the broadcaster cannot run with.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds a value the broadcaster cannot run with.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_defaults = ServerSettings::default();
        let poll_defaults = PollSettings::default();
        let provider_defaults = ProviderSettings::default();

        let server = ServerSettings {
            port: parse_env_u16(&lookup, "PORT", server_defaults.port),
            health_port: parse_env_u16(
                &lookup,
                "SNAPSHOT_HEALTH_PORT",
                server_defaults.health_port,
            ),
        };

        let interval = parse_env_duration_secs(
            &lookup,
            "SNAPSHOT_POLL_INTERVAL_SECS",
            poll_defaults.interval,
        );
        if interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "SNAPSHOT_POLL_INTERVAL_SECS".to_string(),
                reason: "poll interval must be at least one second".to_string(),
            });
        }

        let channel_capacity = parse_env_usize(
            &lookup,
            "SNAPSHOT_CHANNEL_CAPACITY",
            poll_defaults.channel_capacity,
        );
        if channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SNAPSHOT_CHANNEL_CAPACITY".to_string(),
                reason: "channel capacity must be positive".to_string(),
            });
        }

        let fallback_currency = lookup("SNAPSHOT_FALLBACK_CURRENCY")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(poll_defaults.fallback_currency);

        let poll = PollSettings {
            interval,
            channel_capacity,
            fallback_currency,
            coalesce_upstream: parse_env_bool(
                &lookup,
                "SNAPSHOT_COALESCE_UPSTREAM",
                poll_defaults.coalesce_upstream,
            ),
        };

        let base_url = match lookup("YAHOO_BASE_URL") {
            Some(v) if v.trim().is_empty() => {
                return Err(ConfigError::EmptyValue("YAHOO_BASE_URL".to_string()));
            }
            Some(v) => v.trim().trim_end_matches('/').to_string(),
            None => provider_defaults.base_url,
        };

        let provider = ProviderSettings {
            base_url,
            timeout: parse_env_duration_millis(
                &lookup,
                "YAHOO_TIMEOUT_MS",
                provider_defaults.timeout,
            ),
        };

        Ok(Self {
            server,
            poll,
            provider,
        })
    }

    /// Broadcaster configuration derived from the poll settings.
    #[must_use]
    pub fn broadcaster(&self) -> BroadcasterConfig {
        BroadcasterConfig::from(&self.poll)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable holds a value the broadcaster cannot use.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// What is wrong with it.
        reason: String,
    },
}

fn parse_env_u16<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: u16) -> u16 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: usize) -> usize {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_env_bool<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: bool) -> bool {
    lookup(key).map_or(default, |v| match v.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    })
}

fn parse_env_duration_secs<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
