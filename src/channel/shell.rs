//! Persistent shell channel
//!
//! Wraps the interactive shell stream of a session and runs the sentinel
//! protocol on it. The stream is opened lazily on the first command and
//! reused afterwards; exactly one command may be in flight at a time, which
//! `&mut self` on [`ShellChannel::execute`] encodes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use super::{cleanup, compose_command, is_complete, DEFAULT_TIMEOUT_SECS, READ_CHUNK_SIZE};
use crate::error::{Error, Result};
use crate::transport::{RemoteSession, RemoteStream};

/// Sentinel-delimited command execution over a persistent interactive shell
pub struct ShellChannel {
    /// Owning session; the channel holds it for lazy (re)opening
    session: Arc<dyn RemoteSession>,
    /// Underlying stream, None until first use
    stream: Option<Box<dyn RemoteStream>>,
    /// Per-command timeout in seconds
    timeout_secs: u64,
    /// Set when a timeout abandoned a command mid-flight. The remote may
    /// still emit output for the abandoned command, so the stream is
    /// discarded and reopened before the next execute instead of reused.
    poisoned: bool,
    /// Raw accumulated output of the last command (diagnostics)
    last_raw: Option<String>,
    /// Cleaned output of the last completed command
    last_clean: Option<String>,
    /// Channel id carried in log fields
    id: Uuid,
}

impl ShellChannel {
    /// Create a channel over `session`. No stream is opened until the first
    /// command runs.
    pub fn new(session: Arc<dyn RemoteSession>) -> Self {
        Self {
            session,
            stream: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poisoned: false,
            last_raw: None,
            last_clean: None,
            id: Uuid::new_v4(),
        }
    }

    /// Current per-command timeout in seconds
    pub fn timeout(&self) -> u64 {
        self.timeout_secs
    }

    /// Override the per-command timeout. Callers that raise it for a single
    /// operation are expected to restore the previous value afterwards.
    pub fn set_timeout(&mut self, seconds: u64) {
        self.timeout_secs = seconds;
    }

    /// Raw output accumulated for the most recent command, including any
    /// partial output retained when the command timed out
    pub fn last_raw_output(&self) -> Option<&str> {
        self.last_raw.as_deref()
    }

    /// Cleaned output of the most recent completed command
    pub fn last_output(&self) -> Option<&str> {
        self.last_clean.as_deref()
    }

    /// Execute `command` on the remote shell and return its cleaned output.
    ///
    /// Blocks until the sentinel arrives or the configured timeout elapses.
    /// On timeout the channel is marked unreliable and the underlying stream
    /// is recreated on the next call.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the session is gone
    /// - [`Error::ChannelOpenFailed`] if the remote refuses a shell
    /// - [`Error::CommandTimeout`] if no completion marker arrives in time
    /// - [`Error::TransportIo`] on read/write failure
    pub async fn execute(&mut self, command: &str) -> Result<String> {
        self.ensure_stream().await?;
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let wire = format!("{}\n", compose_command(command));
        stream.write_all(wire.as_bytes()).await?;
        debug!(channel = %self.id, command, "command written");

        let timeout = Duration::from_secs(self.timeout_secs);
        let started = Instant::now();
        let mut accumulated = String::new();
        loop {
            // Empty chunks are normal: the shell produced nothing within the
            // poll interval.
            let chunk = stream.read_chunk(READ_CHUNK_SIZE).await?;
            if !chunk.is_empty() {
                accumulated.push_str(&String::from_utf8_lossy(&chunk));
                self.last_raw = Some(accumulated.clone());
            }
            if is_complete(&accumulated) {
                let clean = cleanup(&accumulated);
                self.last_clean = Some(clean.clone());
                return Ok(clean);
            }
            if started.elapsed() > timeout {
                warn!(
                    channel = %self.id,
                    command,
                    timeout_secs = self.timeout_secs,
                    "command timed out; remote state is unknown"
                );
                self.poisoned = true;
                return Err(Error::CommandTimeout {
                    seconds: self.timeout_secs,
                });
            }
        }
    }

    /// Write `line` to the shell without the completion protocol and drain
    /// whatever arrives within `settle_secs`.
    ///
    /// For commands that replace the shell itself (`sudo su`, `exit`): the
    /// sentinel echo would only run after the replacement shell exits, so no
    /// completion can be awaited. The drained output is retained for
    /// diagnostics but never interpreted.
    pub async fn send_raw(&mut self, line: &str, settle_secs: u64) -> Result<()> {
        self.ensure_stream().await?;
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        stream.write_all(format!("{}\n", line).as_bytes()).await?;
        debug!(channel = %self.id, line, "raw line written");

        let deadline = Instant::now() + Duration::from_secs(settle_secs);
        let mut drained = String::new();
        while Instant::now() < deadline {
            let chunk = stream.read_chunk(READ_CHUNK_SIZE).await?;
            if !chunk.is_empty() {
                drained.push_str(&String::from_utf8_lossy(&chunk));
            }
        }
        if !drained.is_empty() {
            self.last_raw = Some(drained);
        }
        Ok(())
    }

    /// Make sure a usable stream is open, replacing one poisoned by a
    /// timeout
    async fn ensure_stream(&mut self) -> Result<()> {
        if !self.session.is_connected() {
            return Err(Error::NotConnected);
        }
        if self.poisoned {
            debug!(channel = %self.id, "discarding shell stream after timeout");
            if let Some(mut stale) = self.stream.take() {
                let _ = stale.close().await;
            }
            self.poisoned = false;
        }
        if self.stream.is_none() {
            self.stream = Some(self.session.open_shell().await?);
            debug!(channel = %self.id, "shell stream opened");
        }
        Ok(())
    }

    /// Close the underlying stream, if open
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.close().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ShellChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellChannel")
            .field("id", &self.id)
            .field("open", &self.stream.is_some())
            .field("timeout_secs", &self.timeout_secs)
            .field("poisoned", &self.poisoned)
            .finish()
    }
}
