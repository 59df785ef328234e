//! OS template cache entries
//!
//! Templates are prebuilt OS images stored as tarballs in the host's
//! template cache. Presence is probed on the remote filesystem before every
//! create; an absent template is fetched from the template repository once,
//! never retried.

use serde::{Deserialize, Serialize};

/// A template as seen in (or destined for) the host's cache directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsTemplate {
    /// Template name, e.g. `centos-6-x86_64`
    pub name: String,
    /// Whether the tarball was present on the host at last probe
    pub present: bool,
    /// URL the template can be fetched from if absent
    pub source_url: String,
}

impl OsTemplate {
    /// Tarball filename in the cache directory
    pub fn filename(&self) -> String {
        format!("{}.tar.gz", self.name)
    }

    /// Full remote path of the tarball under `cache_dir`
    pub fn cache_path(&self, cache_dir: &str) -> String {
        format!("{}/{}", cache_dir.trim_end_matches('/'), self.filename())
    }
}
