use std::path::{Path, PathBuf};
use std::sync::Once;

use tracing::debug;

use crate::config::types::RelayConfig;
use crate::error::{RelayError, Result};

/// Get the default configuration file path
pub fn get_config_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("com", "chat-relay", "chat-relay") {
        proj_dirs.config_dir().join("config.toml")
    } else {
        // Fallback to home directory
        dirs_fallback().join(".chat-relay").join("config.toml")
    }
}

fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

static ENV_LOADER: Once = Once::new();

/// Loads variables from a `.env` file in the working directory, once.
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded environment file");
        }
    });
}

/// Load configuration from file, with defaults for missing values.
///
/// An explicitly requested file must exist; the default location is optional.
pub fn load_config(config_path: Option<&Path>) -> Result<RelayConfig> {
    ensure_env_loaded();

    let path = match config_path {
        Some(path) => {
            if !path.exists() {
                return Err(RelayError::ConfigNotFound {
                    path: path.display().to_string(),
                });
            }
            path.to_path_buf()
        }
        None => {
            let path = get_config_path();
            if !path.exists() {
                debug!(path = %path.display(), "No configuration file, using defaults");
                return Ok(RelayConfig::default());
            }
            path
        }
    };

    let content = std::fs::read_to_string(&path)?;
    let config: RelayConfig =
        toml::from_str(&content).map_err(|e| RelayError::TomlParse(e.to_string()))?;

    debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}
