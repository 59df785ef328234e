//! Key file resolution
//!
//! Resolves a private/public key pair from a base path, with the public key
//! defaulting to `<private>.pub`. A pair is only offered for authentication
//! when both files exist; otherwise the caller falls back to password auth.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A resolved private/public key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFiles {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

impl KeyFiles {
    /// Pair a private key with an explicit or derived public key path
    pub fn new(private_key: impl Into<PathBuf>, public_key: Option<PathBuf>) -> Self {
        let private_key = private_key.into();
        let public_key = public_key.unwrap_or_else(|| {
            let mut derived = private_key.as_os_str().to_owned();
            derived.push(".pub");
            PathBuf::from(derived)
        });
        Self {
            private_key,
            public_key,
        }
    }

    /// The conventional default pair under the user's `.ssh` directory
    pub fn default_pair() -> Option<Self> {
        dirs::home_dir().map(|home| Self::new(home.join(".ssh").join("id_rsa"), None))
    }

    /// Whether both files are present on disk
    pub fn exists(&self) -> bool {
        self.private_key.is_file() && self.public_key.is_file()
    }

    /// Fail unless both files are present
    pub fn ensure_exists(&self) -> Result<()> {
        if self.exists() {
            return Ok(());
        }
        Err(Error::KeyFilesNotFound {
            private_key: self.private_key.clone(),
            public_key: self.public_key.clone(),
        })
    }

    pub fn private_key(&self) -> &Path {
        &self.private_key
    }
}
