// Project-wide constants
//
// Centralised here so ports, rates and sweep timings have one source of
// truth. Import via `use crate::config::constants::*;`.

/// Default HTTP port for the registry.
pub const DEFAULT_HTTP_PORT: u16 = 3883;

/// Default bind address (all interfaces).
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3883";

/// Name reported by the health endpoint.
pub const SERVICE_NAME: &str = "license-registry";

/// Steady-state admission rate shared by all routes.
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 1000.0;

/// Token bucket capacity (short-term burst allowance).
pub const DEFAULT_BURST: u32 = 2000;

/// Per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// How long in-flight requests may drain after a shutdown signal.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Largest accepted request body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1 << 20;

/// Period of the eviction sweep.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Devices silent for longer than this are evicted.
pub const DEFAULT_INACTIVE_TIMEOUT_SECS: u64 = 5 * 60;

/// A transfer target must have been seen within this window.
pub const DEFAULT_TRANSFER_ACTIVITY_WINDOW_SECS: u64 = 10 * 60;

/// Idle response maps kept for reuse.
pub const DEFAULT_POOL_MAX_IDLE: usize = 256;

/// Prefix for environment overrides, e.g. `LICENSE_REGISTRY__SERVER__BIND_ADDRESS`.
pub const ENV_PREFIX: &str = "LICENSE_REGISTRY";
