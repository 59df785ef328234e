//! OpenVZ node control
//!
//! The client and its operation families. `client` owns the session and
//! shell channel; `lifecycle` and `bandwidth` add the operation `impl`
//! blocks; `password` generates root passwords for provisioning.

pub mod bandwidth;
pub mod client;
pub mod lifecycle;
pub mod password;

pub use bandwidth::BandwidthUsage;
pub use client::VzClient;
