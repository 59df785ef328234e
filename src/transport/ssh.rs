//! SSH transport implementation
//!
//! russh-backed [`RemoteSession`]: connects, authenticates with a key pair
//! when one resolves (falling back to password auth), records the host key
//! fingerprint during the handshake, and hands out shell/exec streams.
//!
//! The shell stream requests a vt102 PTY sized 180x124, matching the
//! geometry the host-side tools were scraped against.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use russh::client::{self, AuthResult, Handle};
use russh::keys::{load_secret_key, ssh_key, PrivateKeyWithHashAlg};
use russh::{ChannelMsg, Disconnect};
use uuid::Uuid;

use super::keys::KeyFiles;
use super::{RemoteSession, RemoteStream};
use crate::error::{Error, Result};

/// Terminal type requested for the interactive shell
const SHELL_TERM: &str = "vt102";
/// Shell geometry (columns x rows)
const SHELL_COLS: u32 = 180;
const SHELL_ROWS: u32 = 124;

/// How long a single read waits for channel traffic before reporting an
/// empty chunk. The command-level timeout lives in the channel layer.
const READ_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Accepts the host key and records its fingerprint.
///
/// Host fingerprinting is exposure, not enforcement: the fingerprint is
/// surfaced to callers for auditing.
struct FingerprintingHandler {
    fingerprint: Arc<StdMutex<Option<String>>>,
}

impl client::Handler for FingerprintingHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let fingerprint = server_public_key
            .fingerprint(ssh_key::HashAlg::Sha256)
            .to_string();
        if let Ok(mut slot) = self.fingerprint.lock() {
            *slot = Some(fingerprint);
        }
        Ok(true)
    }
}

/// An authenticated SSH session on one host
pub struct SshSession {
    handle: Handle<FingerprintingHandler>,
    fingerprint: Arc<StdMutex<Option<String>>>,
    host: String,
    user: String,
    connected_at: DateTime<Utc>,
    id: Uuid,
}

impl SshSession {
    /// Open a connection and authenticate.
    ///
    /// When `keys` resolves to an existing pair, public-key authentication
    /// is attempted with `password` as the key passphrase; otherwise the
    /// password authenticates directly.
    pub async fn connect(
        host: &str,
        port: u16,
        user: &str,
        password: &str,
        keys: Option<&KeyFiles>,
    ) -> Result<Self> {
        let config = Arc::new(client::Config::default());
        let fingerprint = Arc::new(StdMutex::new(None));
        let handler = FingerprintingHandler {
            fingerprint: Arc::clone(&fingerprint),
        };

        let mut handle = client::connect(config, (host, port), handler)
            .await
            .map_err(|e| Error::ConnectFailed {
                host: host.to_string(),
                reason: e.to_string(),
            })?;

        let auth = match keys.filter(|k| k.exists()) {
            Some(keys) => {
                debug!(key = %keys.private_key().display(), "attempting public key authentication");
                let passphrase = if password.is_empty() {
                    None
                } else {
                    Some(password)
                };
                let key = load_secret_key(keys.private_key(), passphrase).map_err(|e| {
                    Error::AuthenticationFailed {
                        user: user.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
                handle
                    .authenticate_publickey(
                        user,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
            }
            None => handle.authenticate_password(user, password).await,
        }
        .map_err(|e| Error::AuthenticationFailed {
            user: user.to_string(),
            reason: e.to_string(),
        })?;

        match auth {
            AuthResult::Success => {}
            AuthResult::Failure { .. } => {
                return Err(Error::AuthenticationFailed {
                    user: user.to_string(),
                    reason: "rejected by host".to_string(),
                });
            }
        }

        let session = Self {
            handle,
            fingerprint,
            host: host.to_string(),
            user: user.to_string(),
            connected_at: Utc::now(),
            id: Uuid::new_v4(),
        };
        info!(
            session = %session.id,
            host = %session.host,
            user = %session.user,
            "connected and logged in"
        );
        Ok(session)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    fn is_connected(&self) -> bool {
        !self.handle.is_closed()
    }

    fn fingerprint(&self) -> Option<String> {
        self.fingerprint.lock().ok().and_then(|slot| slot.clone())
    }

    async fn open_shell(&self) -> Result<Box<dyn RemoteStream>> {
        let channel =
            self.handle
                .channel_open_session()
                .await
                .map_err(|e| Error::ChannelOpenFailed {
                    reason: e.to_string(),
                })?;
        channel
            .request_pty(false, SHELL_TERM, SHELL_COLS, SHELL_ROWS, 0, 0, &[])
            .await
            .map_err(|e| Error::ChannelOpenFailed {
                reason: e.to_string(),
            })?;
        channel
            .request_shell(false)
            .await
            .map_err(|e| Error::ChannelOpenFailed {
                reason: e.to_string(),
            })?;
        Ok(Box::new(SshStream::new(channel)))
    }

    async fn open_exec(&self, command: &str) -> Result<Box<dyn RemoteStream>> {
        let channel =
            self.handle
                .channel_open_session()
                .await
                .map_err(|e| Error::ChannelOpenFailed {
                    reason: e.to_string(),
                })?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::ChannelOpenFailed {
                reason: e.to_string(),
            })?;
        Ok(Box::new(SshStream::new(channel)))
    }

    async fn close(&self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| Error::TransportIo {
                reason: e.to_string(),
            })?;
        info!(session = %self.id, host = %self.host, "ssh session closed");
        Ok(())
    }
}

/// One SSH channel exposed as a chunked byte stream
struct SshStream {
    channel: russh::Channel<client::Msg>,
    /// Bytes received but not yet handed to the reader
    buffer: Vec<u8>,
    eof: bool,
}

impl SshStream {
    fn new(channel: russh::Channel<client::Msg>) -> Self {
        Self {
            channel,
            buffer: Vec::new(),
            eof: false,
        }
    }
}

#[async_trait]
impl RemoteStream for SshStream {
    async fn read_chunk(&mut self, max_len: usize) -> Result<Vec<u8>> {
        if self.buffer.is_empty() && !self.eof {
            match tokio::time::timeout(READ_POLL_INTERVAL, self.channel.wait()).await {
                // No traffic within the poll interval: empty chunk, the
                // caller's deadline logic decides when to give up.
                Err(_) => {}
                Ok(None) => self.eof = true,
                Ok(Some(msg)) => match msg {
                    ChannelMsg::Data { ref data } => self.buffer.extend_from_slice(data),
                    ChannelMsg::ExtendedData { ref data, .. } => {
                        self.buffer.extend_from_slice(data)
                    }
                    ChannelMsg::Eof | ChannelMsg::Close => self.eof = true,
                    _ => {}
                },
            }
        }
        let take = self.buffer.len().min(max_len);
        Ok(self.buffer.drain(..take).collect())
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.channel
            .data(data)
            .await
            .map_err(|e| Error::TransportIo {
                reason: e.to_string(),
            })
    }

    async fn close(&mut self) -> Result<()> {
        let _ = self.channel.eof().await;
        self.channel.close().await.map_err(|e| Error::TransportIo {
            reason: e.to_string(),
        })
    }
}
