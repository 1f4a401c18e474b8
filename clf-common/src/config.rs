//! Configuration file resolution and loading
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`CLF_CONFIG`)
//! 3. User config file (`<config dir>/clf/config.toml`)
//! 4. System config file (`/etc/clf/config.toml`)

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "CLF_CONFIG";

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve which configuration file to load
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // Priority 3/4: platform config locations
    default_config_file()
}

/// Get the first existing platform configuration file
fn default_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("clf").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/clf/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config(format!(
        "No config file found. Pass --config <file>, set {}, or create ~/.config/clf/config.toml",
        CONFIG_ENV_VAR
    )))
}

/// Read and deserialize a TOML configuration file
pub fn load_toml_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    let config = toml::from_str(&content)?;

    tracing::debug!(path = %path.display(), "Loaded configuration file");
    Ok(config)
}
