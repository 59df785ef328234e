//! OpenVZ client
//!
//! [`VzClient`] ties a configuration, an authenticated session, and one
//! persistent shell channel together. Lifecycle and bandwidth operations
//! live in sibling modules as further `impl` blocks; everything funnels
//! through [`VzClient::shell_execute`] so the sentinel protocol and the
//! per-operation timeouts are applied in exactly one place.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::channel::ShellChannel;
use crate::config::VzConfig;
use crate::error::{Error, Result};
use crate::transport::scp;
use crate::transport::ssh::SshSession;
use crate::transport::{KeyFiles, RemoteSession};

/// Client for one OpenVZ hardware node
pub struct VzClient {
    config: VzConfig,
    host: String,
    user: String,
    session: Option<Arc<dyn RemoteSession>>,
    channel: Option<ShellChannel>,
}

impl VzClient {
    /// Connect to `host` and authenticate as `user`.
    ///
    /// Key-pair authentication is attempted when the configured (or
    /// conventional) key files exist, with `password` as the passphrase;
    /// otherwise `password` authenticates directly. Connection attempts are
    /// retried up to the configured budget before the last error surfaces.
    pub async fn connect(
        config: VzConfig,
        host: &str,
        user: &str,
        password: &str,
    ) -> Result<Self> {
        config.validate()?;
        let keys = match &config.connection.key_file {
            Some(path) => Some(KeyFiles::new(path.clone(), None)),
            None => KeyFiles::default_pair(),
        };
        let port = config.connection.port;
        let retries = config.connection.retries;

        let mut last_error = Error::ConnectFailed {
            host: host.to_string(),
            reason: "no connection attempts made".to_string(),
        };
        for attempt in 1..=retries {
            match SshSession::connect(host, port, user, password, keys.as_ref()).await {
                Ok(session) => {
                    let session: Arc<dyn RemoteSession> = Arc::new(session);
                    return Ok(Self::with_session(config, host, user, session));
                }
                Err(err) => {
                    warn!(host, attempt, retries, error = %err, "connection attempt failed");
                    last_error = err;
                    if attempt < retries {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
        Err(last_error)
    }

    /// Build a client over an already established session.
    ///
    /// This is the seam in-process transports plug into; `connect` uses it
    /// after authenticating a real SSH session.
    pub fn with_session(
        config: VzConfig,
        host: &str,
        user: &str,
        session: Arc<dyn RemoteSession>,
    ) -> Self {
        let mut channel = ShellChannel::new(Arc::clone(&session));
        channel.set_timeout(config.timeouts.default);
        Self {
            config,
            host: host.to_string(),
            user: user.to_string(),
            session: Some(session),
            channel: Some(channel),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn config(&self) -> &VzConfig {
        &self.config
    }

    /// Whether an authenticated session is currently held
    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.is_connected())
            .unwrap_or(false)
    }

    /// Host key fingerprint recorded during the handshake, if any
    pub fn fingerprint(&self) -> Option<String> {
        self.session.as_ref().and_then(|s| s.fingerprint())
    }

    pub(crate) fn session(&self) -> Result<&Arc<dyn RemoteSession>> {
        self.session.as_ref().ok_or(Error::NotConnected)
    }

    pub(crate) fn channel_mut(&mut self) -> Result<&mut ShellChannel> {
        self.channel.as_mut().ok_or(Error::NotConnected)
    }

    /// Run one command on the persistent shell and return its cleaned
    /// output. This is also the escape hatch for host commands no lifecycle
    /// method covers.
    pub async fn shell_execute(&mut self, command: &str) -> Result<String> {
        self.channel_mut()?.execute(command).await
    }

    /// Run one command under a temporary timeout, restoring the previous
    /// value afterwards whether or not the command succeeded
    pub(crate) async fn execute_with_timeout(
        &mut self,
        command: &str,
        seconds: u64,
    ) -> Result<String> {
        let channel = self.channel_mut()?;
        let previous = channel.timeout();
        channel.set_timeout(seconds);
        let result = channel.execute(command).await;
        channel.set_timeout(previous);
        result
    }

    /// Raw output accumulated for the most recent shell command, including
    /// partial output from a timed-out command
    pub fn last_raw_output(&self) -> Option<&str> {
        self.channel.as_ref().and_then(|c| c.last_raw_output())
    }

    /// Become `target_user` on the remote shell via `sudo su`.
    ///
    /// `sudo su` replaces the shell reading our commands, so the switch is
    /// written without the completion protocol and given a short settle
    /// window; `whoami` then verifies the identity actually changed. On
    /// success the PATH is extended with the sbin directories the host
    /// tools live in.
    pub async fn elevate(&mut self, target_user: &str) -> Result<()> {
        let settle = self.config.timeouts.fire_and_forget;
        let channel = self.channel_mut()?;
        channel
            .send_raw(&format!("sudo su {}", target_user), settle)
            .await?;
        let output = channel.execute("whoami").await?;
        let confirmed = output.lines().any(|line| line.trim() == target_user);
        if !confirmed {
            let actual = output
                .lines()
                .rev()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or("")
                .to_string();
            return Err(Error::ElevationFailed {
                requested: target_user.to_string(),
                actual,
            });
        }
        channel
            .execute("export PATH=$PATH:/usr/sbin:/sbin")
            .await?;
        info!(user = target_user, host = %self.host, "elevated remote identity");
        Ok(())
    }

    /// Exit the remote shell and tear the session down. Safe to call when
    /// already disconnected.
    pub async fn disconnect(&mut self) -> Result<()> {
        let settle = self.config.timeouts.fire_and_forget;
        if let Some(mut channel) = self.channel.take() {
            // The shell dies on exit, so no completion can be awaited.
            let _ = channel.send_raw("exit", settle).await;
            let _ = channel.close().await;
        }
        if let Some(session) = self.session.take() {
            session.close().await?;
        }
        info!(host = %self.host, "disconnected");
        Ok(())
    }

    /// Copy a local file into `remote_dir` on the host
    pub async fn send_file(&self, local_path: &Path, remote_dir: &str) -> Result<()> {
        scp::send_file(self.session()?.as_ref(), local_path, remote_dir).await
    }

    /// Fetch a remote file into `local_dir` (the working directory when
    /// None) and return the written path
    pub async fn fetch_file(
        &self,
        remote_path: &str,
        local_dir: Option<&Path>,
    ) -> Result<std::path::PathBuf> {
        scp::receive_file(self.session()?.as_ref(), remote_path, local_dir).await
    }
}

impl std::fmt::Debug for VzClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VzClient")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("connected", &self.is_connected())
            .finish()
    }
}
