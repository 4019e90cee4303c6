// Configuration module
// Public interface for configuration loading

pub mod constants;
mod loader;
mod settings;

use std::path::PathBuf;
use thiserror::Error;

pub use loader::{default_config_path, environment, load_settings, load_settings_with_env};
pub use settings::{PoolSettings, RateLimitSettings, RegistrySettings, ServerSettings, Settings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("configuration file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
