//! VzRemote - OpenVZ container management over SSH
//!
//! This library drives the OpenVZ tooling (`vzctl`, `vzlist`, `vzmigrate`)
//! on a remote hardware node through an interactive SSH shell. The node
//! offers no API: commands and their output share one byte stream with a
//! human-oriented shell, so completion is detected with a sentinel echo and
//! results are scraped from operator-facing text.
//!
//! ## Module Organization
//!
//! ### Core Functionality
//!
//! - [`vz`] - The [`VzClient`] and its lifecycle/bandwidth operations
//! - [`channel`] - Sentinel-delimited command execution (shell and exec)
//! - [`classify`] - Text-pattern outcome classification for `vzctl` output
//! - [`transport`] - SSH sessions, key resolution, SCP file transfer
//! - [`models`] - Data structures (Container, CreateResult, OsTemplate)
//! - [`mod@error`] - Error types and Result aliases
//!
//! ### Supporting
//!
//! - [`config`] - TOML configuration (timeouts, retries, template cache)
//!
//! ## Quick Start
//!
//! ```no_run
//! use vzremote::{init, VzClient};
//!
//! # async fn run() -> vzremote::Result<()> {
//! let config = init()?;
//! let mut vz = VzClient::connect(config, "node1.example.com", "admin", "p4ssw0rd").await?;
//! vz.elevate("root").await?;
//! let containers = vz.list_containers().await?;
//! for (veid, container) in &containers {
//!     println!("{}: {}", veid, container.status);
//! }
//! vz.disconnect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Reliability
//!
//! - **No Panics:** All fallible operations return `Result`
//! - **Idempotent Lifecycle:** Stopping a stopped container (or starting a
//!   running one) is an outcome, not an error
//! - **Timeout Containment:** A timed-out command poisons only its shell
//!   stream, which is replaced before the next command
//! - **Destructive-Op Guard:** `destroy` requires explicit confirmation
//!   before any remote command is sent

#[macro_use]
extern crate tracing;

pub mod config;
pub mod error;

// Core modules
pub mod channel;
pub mod classify;
pub mod models;
pub mod transport;
pub mod vz;

// Re-exports for core functionality
pub use channel::{ExecChannel, ShellChannel};
pub use classify::{classify, ClassifierTable, Operation, Outcome};
pub use config::VzConfig;
pub use error::{Error, Result};
pub use models::{Container, ContainerStatus, CreateResult, OsTemplate, Veid};
pub use vz::{BandwidthUsage, VzClient};

// Convenience re-exports for common types
pub use config::loader::ConfigLoader;
pub use transport::{KeyFiles, RemoteSession, RemoteStream};

// Version information
/// The current version of VzRemote from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The crate name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Load configuration from the default locations, falling back to the
/// built-in defaults when no file exists or an existing file is invalid.
///
/// # Errors
///
/// Never fails today; the `Result` return leaves room for startup checks
/// that can.
pub fn init() -> Result<VzConfig> {
    info!("Initializing {} v{}", NAME, VERSION);
    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Configuration load failed ({}), using defaults", e);
            VzConfig::default()
        }
    };
    Ok(config)
}

/// Install a global `tracing` subscriber honoring `RUST_LOG`, defaulting to
/// `info`. Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
