// src/config.rs

//! Configuration loading utilities.
//!
//! The configuration lives next to the persisted leads, as `config.toml`
//! inside the storage directory.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::Config;

/// File name of the configuration inside the storage directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Path of the configuration file for a storage directory.
pub fn config_path(storage_dir: &Path) -> PathBuf {
    storage_dir.join(CONFIG_FILE)
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file is missing or does not parse.
pub fn load_config(path: &Path) -> Config {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Config::default();
    }
    Config::load(path).unwrap_or_else(|e| {
        log::warn!("Failed to load config from {path:?}: {e}");
        log::warn!("Using default configuration.");
        Config::default()
    })
}

/// Load and validate the configuration of a storage directory.
pub fn load_all(storage_dir: &Path) -> Result<Config> {
    let config = load_config(&config_path(storage_dir));
    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid configuration: {e}")))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_all(dir.path()).unwrap();
        assert_eq!(config.quota.free_daily_limit, 25);
    }

    #[test]
    fn test_broken_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(config_path(dir.path()), "[crawler\nnot toml").unwrap();
        let config = load_all(dir.path()).unwrap();
        assert_eq!(config.crawler.timeout_secs, 10);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            config_path(dir.path()),
            "[crawler]\ntimeout_secs = 0\n",
        )
        .unwrap();
        assert!(matches!(load_all(dir.path()), Err(AppError::Config(_))));
    }
}
