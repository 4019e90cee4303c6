// Logging setup
//
// tracing-subscriber with an EnvFilter: RUST_LOG wins when set, otherwise
// `info` (or `debug` with --verbose).

use tracing_subscriber::EnvFilter;

/// Default filter when RUST_LOG is unset.
pub fn default_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    EnvFilter::new(format!("license_registry={level},tower_http={level},warn"))
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
