//! Container entities
//!
//! A container ("VPS") is identified by a positive integer veid. The five
//! `Container` fields mirror the fixed capture order of the host's listing
//! command, including its column quirks; they are stored as captured, not
//! reinterpreted.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::Error;

/// Positive integer container identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Veid(u32);

impl Veid {
    /// Validate a raw id; zero is rejected
    pub fn new(raw: u32) -> Result<Self, Error> {
        if raw == 0 {
            return Err(Error::InvalidIdentifier {
                veid: raw.to_string(),
            });
        }
        Ok(Self(raw))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl FromStr for Veid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u32 = s.trim().parse().map_err(|_| Error::InvalidIdentifier {
            veid: s.to_string(),
        })?;
        Veid::new(raw)
    }
}

impl fmt::Display for Veid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status as reported by the listing command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Running,
    Stopped,
    Mounted,
    Destroyed,
    Unknown,
}

impl FromStr for ContainerStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "running" => ContainerStatus::Running,
            "stopped" => ContainerStatus::Stopped,
            "mounted" => ContainerStatus::Mounted,
            "destroyed" => ContainerStatus::Destroyed,
            _ => ContainerStatus::Unknown,
        })
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            ContainerStatus::Running => "running",
            ContainerStatus::Stopped => "stopped",
            ContainerStatus::Mounted => "mounted",
            ContainerStatus::Destroyed => "destroyed",
            ContainerStatus::Unknown => "unknown",
        };
        write!(f, "{}", word)
    }
}

/// One row of the container listing.
///
/// Field order follows the listing command's five-column capture exactly.
/// The upstream tool's column layout does not always line up with the
/// column headers (the fourth capture is numeric and lands in `ip_addr`);
/// the captures are preserved as-is rather than corrected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Column 1: container identifier
    pub veid: u32,
    /// Column 2: process count; `-` for containers that are not running
    pub nproc: Option<u32>,
    /// Column 3: status word
    pub status: ContainerStatus,
    /// Column 4: dotted-numeric field as captured
    pub ip_addr: String,
    /// Column 5: trailing address/hostname field as captured
    pub hostname: String,
}

/// Descriptor assembled after a successful create sequence
#[derive(Clone)]
pub struct CreateResult {
    pub veid: u32,
    /// OS template the private area was provisioned from
    pub os_template: String,
    /// Main IP address assigned to the container
    pub ip_addr: String,
    /// Root password, either caller-supplied or generated; wiped from
    /// memory when the result is dropped
    pub root_password: Zeroizing<String>,
    /// Merged settings the create sequence applied (caller settings plus
    /// the mandatory ones)
    pub settings: BTreeMap<String, String>,
    /// Whether the post-create start reported success
    pub started: bool,
}

impl fmt::Debug for CreateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never leak the password through logs or assert output.
        f.debug_struct("CreateResult")
            .field("veid", &self.veid)
            .field("os_template", &self.os_template)
            .field("ip_addr", &self.ip_addr)
            .field("root_password", &"<redacted>")
            .field("settings", &self.settings)
            .field("started", &self.started)
            .finish()
    }
}
