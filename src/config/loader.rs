//! Configuration file loading
//!
//! Finds and loads `vzremote.toml` from the standard locations, falling
//! back to built-in defaults when nothing is found. Loading never panics;
//! an unreadable or invalid file surfaces as `ConfigLoadFailed` so the
//! caller can decide whether to fall back.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::VzConfig;
use crate::error::{Error, Result};

const CONFIG_FILE_NAME: &str = "vzremote.toml";

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Candidate locations, highest priority first: `$VZREMOTE_CONFIG`,
    /// the working directory, then the user config directory.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(explicit) = env::var("VZREMOTE_CONFIG") {
            paths.push(PathBuf::from(explicit));
        }
        paths.push(PathBuf::from(CONFIG_FILE_NAME));
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("vzremote").join(CONFIG_FILE_NAME));
        }
        paths
    }

    /// Load from the first existing search path, or defaults when no file
    /// exists anywhere.
    pub fn load() -> Result<VzConfig> {
        for path in Self::search_paths() {
            if path.is_file() {
                info!("Loading configuration from {}", path.display());
                return Self::load_from_path(&path);
            }
        }
        debug!("No configuration file found, using defaults");
        Ok(VzConfig::default())
    }

    /// Load and validate a specific file
    pub fn load_from_path(path: &Path) -> Result<VzConfig> {
        let text = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: VzConfig = toml::from_str(&text).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize `config` to `path` as TOML
    pub fn save_to_path(config: &VzConfig, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(config)
            .map_err(|e| Error::Other(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text)?;
        Ok(())
    }
}
