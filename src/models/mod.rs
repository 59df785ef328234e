//! Data structures for vzremote
//!
//! Value objects shared across the transport, channel, and lifecycle
//! layers. Nothing here caches remote truth: container existence and status
//! are re-derived from a fresh listing on every query.

pub mod container;
pub mod template;

pub use container::{Container, ContainerStatus, CreateResult, Veid};
pub use template::OsTemplate;
