//! Transport layer
//!
//! The secure transport is a collaborator, not part of the command protocol:
//! everything above this module talks to the [`RemoteSession`] and
//! [`RemoteStream`] traits. The russh-backed implementation lives in
//! [`ssh`]; tests substitute scripted sessions.

pub mod keys;
pub mod scp;
pub mod ssh;

pub use keys::KeyFiles;
pub use ssh::SshSession;

use async_trait::async_trait;

use crate::error::Result;

/// An authenticated session on a remote host.
///
/// A session yields two channel kinds: a long-lived interactive shell stream
/// (reused across commands) and a one-shot exec stream (one per command).
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Whether the session is still usable
    fn is_connected(&self) -> bool;

    /// Negotiated host key fingerprint, if the handshake recorded one
    fn fingerprint(&self) -> Option<String>;

    /// Open the interactive shell stream
    async fn open_shell(&self) -> Result<Box<dyn RemoteStream>>;

    /// Open a one-shot exec stream running `command`
    async fn open_exec(&self, command: &str) -> Result<Box<dyn RemoteStream>>;

    /// Tear the session down
    async fn close(&self) -> Result<()>;
}

/// A bidirectional byte stream on a session.
///
/// Reads are chunked and non-failing on silence: an empty return means no
/// data arrived within the poll interval, not end-of-stream or error.
#[async_trait]
pub trait RemoteStream: Send {
    /// Read up to `max_len` bytes; may return an empty buffer
    async fn read_chunk(&mut self, max_len: usize) -> Result<Vec<u8>>;

    /// Write all bytes to the stream
    async fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Close the stream
    async fn close(&mut self) -> Result<()>;
}
