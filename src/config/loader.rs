// Configuration loader
// Layers built-in defaults, an optional TOML file and LICENSE_REGISTRY__*
// environment variables, then validates the result.

use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};

use super::constants::ENV_PREFIX;
use super::settings::Settings;
use super::ConfigError;

/// Default config file location: `<config dir>/license-registry/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("license-registry").join("config.toml"))
}

/// Load settings from the process environment.
///
/// An explicit `path` must exist. Without one, the default location is read
/// if present.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    load_settings_with_env(path, environment())
}

/// Same as [`load_settings`] with a caller-supplied environment source.
pub fn load_settings_with_env(
    path: Option<&Path>,
    env: Environment,
) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);

    match path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        None => {
            if let Some(default_path) = default_config_path() {
                builder = builder.add_source(
                    File::from(default_path)
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }
    }

    let settings: Settings = builder.add_source(env).build()?.try_deserialize()?;
    settings.validate()?;

    tracing::debug!(
        bind = %settings.server.bind_address,
        rate = settings.rate_limit.requests_per_second,
        burst = settings.rate_limit.burst,
        "Configuration loaded"
    );

    Ok(settings)
}

/// Environment source for `LICENSE_REGISTRY__SECTION__KEY` variables.
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
