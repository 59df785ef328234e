//! Configuration management for vzremote
//!
//! TOML-backed configuration covering connection behavior, per-operation
//! command timeouts, and template provisioning. Every field has a default
//! matching the host-side tooling's conventions, so a missing or partial
//! config file degrades gracefully.

pub mod loader;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration structure for vzremote
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VzConfig {
    /// Connection and authentication behavior
    pub connection: ConnectionConfig,

    /// Per-operation command timeouts
    pub timeouts: TimeoutConfig,

    /// OS template provisioning
    pub templates: TemplateConfig,

    /// Generated root password length
    pub password_length: usize,
}

impl Default for VzConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            timeouts: TimeoutConfig::default(),
            templates: TemplateConfig::default(),
            password_length: 8,
        }
    }
}

/// Connection-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Attempts before `connect` gives up
    pub retries: u32,

    /// Default SSH port
    pub port: u16,

    /// Private key path; public key is assumed at `<path>.pub`. None means
    /// password authentication only.
    pub key_file: Option<PathBuf>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            retries: 10,
            port: 22,
            key_file: None,
        }
    }
}

/// Timeouts in seconds, per operation class
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default for ordinary commands
    pub default: u64,

    /// Container stop (the container may flush and unmount)
    pub stop: u64,

    /// Container start
    pub start: u64,

    /// Container restart
    pub restart: u64,

    /// Fire-and-forget commands around disconnect/elevation
    pub fire_and_forget: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default: 30,
            stop: 120,
            start: 60,
            restart: 120,
            fire_and_forget: 1,
        }
    }
}

/// OS template provisioning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Template cache directory on the host
    pub cache_dir: String,

    /// Repository precreated templates are fetched from
    pub repository_url: String,

    /// Timeout for a template download, in seconds
    pub fetch_timeout: u64,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            cache_dir: "/vz/template/cache".to_string(),
            repository_url: "http://download.openvz.org/template/precreated".to_string(),
            fetch_timeout: 9000,
        }
    }
}

impl VzConfig {
    /// Validate field ranges; zero timeouts or retry budgets are always
    /// misconfiguration.
    pub fn validate(&self) -> Result<()> {
        if self.connection.retries == 0 {
            return Err(Error::ConfigValidationFailed {
                field: "connection.retries".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.timeouts.default == 0 {
            return Err(Error::ConfigValidationFailed {
                field: "timeouts.default".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.password_length == 0 {
            return Err(Error::ConfigValidationFailed {
                field: "password_length".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.templates.cache_dir.is_empty() {
            return Err(Error::ConfigValidationFailed {
                field: "templates.cache_dir".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
