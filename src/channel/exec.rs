//! One-shot exec channel
//!
//! Same sentinel protocol as [`super::ShellChannel`], but each command is
//! submitted as a single non-interactive exec request and the stream is
//! closed when the command completes or times out. No state survives
//! between calls, so there is no residual-output hazard here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{cleanup, compose_command, is_complete, DEFAULT_TIMEOUT_SECS, READ_CHUNK_SIZE};
use crate::error::{Error, Result};
use crate::transport::RemoteSession;

/// Sentinel-delimited command execution over per-call exec requests
pub struct ExecChannel {
    session: Arc<dyn RemoteSession>,
    timeout_secs: u64,
}

impl ExecChannel {
    pub fn new(session: Arc<dyn RemoteSession>) -> Self {
        Self {
            session,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Current per-command timeout in seconds
    pub fn timeout(&self) -> u64 {
        self.timeout_secs
    }

    /// Override the per-command timeout
    pub fn set_timeout(&mut self, seconds: u64) {
        self.timeout_secs = seconds;
    }

    /// Run `command` in a fresh exec request and return its cleaned output
    pub async fn execute(&self, command: &str) -> Result<String> {
        if !self.session.is_connected() {
            return Err(Error::NotConnected);
        }
        let wire = compose_command(command);
        let mut stream = self.session.open_exec(&wire).await?;

        let timeout = Duration::from_secs(self.timeout_secs);
        let started = Instant::now();
        let mut accumulated = String::new();
        loop {
            let chunk = stream.read_chunk(READ_CHUNK_SIZE).await?;
            if !chunk.is_empty() {
                accumulated.push_str(&String::from_utf8_lossy(&chunk));
            }
            if is_complete(&accumulated) {
                let _ = stream.close().await;
                return Ok(cleanup(&accumulated));
            }
            if started.elapsed() > timeout {
                let _ = stream.close().await;
                return Err(Error::CommandTimeout {
                    seconds: self.timeout_secs,
                });
            }
        }
    }
}
