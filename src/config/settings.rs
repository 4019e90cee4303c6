// Configuration structs

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use super::constants::*;
use super::ConfigError;

/// HTTP listener and per-request limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address (e.g., "0.0.0.0:3883")
    pub bind_address: String,
    /// Deadline applied to every request
    pub request_timeout_secs: u64,
    /// Drain window after a shutdown signal
    pub shutdown_timeout_secs: u64,
    /// Maximum request body size in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDR.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Token bucket shared by every route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Tokens added per second (sustained rate)
    pub requests_per_second: f64,
    /// Bucket capacity
    pub burst: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            burst: DEFAULT_BURST,
        }
    }
}

/// Eviction and transfer admission timings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    pub sweep_interval_secs: u64,
    pub inactive_timeout_secs: u64,
    pub transfer_activity_window_secs: u64,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            inactive_timeout_secs: DEFAULT_INACTIVE_TIMEOUT_SECS,
            transfer_activity_window_secs: DEFAULT_TRANSFER_ACTIVITY_WINDOW_SECS,
        }
    }
}

impl RegistrySettings {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn inactive_timeout(&self) -> Duration {
        Duration::from_secs(self.inactive_timeout_secs)
    }

    pub fn transfer_activity_window(&self) -> Duration {
        Duration::from_secs(self.transfer_activity_window_secs)
    }
}

/// Response object pool sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub max_idle: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_idle: DEFAULT_POOL_MAX_IDLE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub rate_limit: RateLimitSettings,
    pub registry: RegistrySettings,
    pub pool: PoolSettings,
}

impl Settings {
    /// Parsed bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind_address
            .parse()
            .map_err(|_| {
                ConfigError::Invalid(format!(
                    "server.bind_address is not a socket address: {}",
                    self.server.bind_address
                ))
            })
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        if !(self.rate_limit.requests_per_second > 0.0) {
            return Err(ConfigError::Invalid(
                "rate_limit.requests_per_second must be positive".into(),
            ));
        }
        if self.rate_limit.burst == 0 {
            return Err(ConfigError::Invalid("rate_limit.burst must be at least 1".into()));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "server.request_timeout_secs must be at least 1".into(),
            ));
        }
        if self.registry.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "registry.sweep_interval_secs must be at least 1".into(),
            ));
        }
        if self.registry.inactive_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "registry.inactive_timeout_secs must be at least 1".into(),
            ));
        }

        Ok(())
    }
}
