//! Shared test utilities

pub mod mock_transport;

use vzremote::config::VzConfig;

/// Configuration tuned for scripted tests: no settle waits, short default
/// timeout, single connection attempt
#[allow(dead_code)]
pub fn test_config() -> VzConfig {
    let mut config = VzConfig::default();
    config.connection.retries = 1;
    config.timeouts.default = 5;
    config.timeouts.stop = 5;
    config.timeouts.start = 5;
    config.timeouts.restart = 5;
    config.timeouts.fire_and_forget = 0;
    config.templates.fetch_timeout = 5;
    config
}
