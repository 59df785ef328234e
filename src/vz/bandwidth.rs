//! Bandwidth accounting
//!
//! Per-container traffic is accounted with paired FORWARD-chain firewall
//! rules (one matching the container's address as source, one as
//! destination) and read back by scraping the verbose counter listing.
//! Adding the rules enables accounting; the counters themselves live in the
//! kernel and survive until reset.

use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::VzClient;
use crate::error::{Error, Result};

/// Counter line of `iptables -L FORWARD -v -x -n`: packets, bytes, then the
/// rest of the rule text
static COUNTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\s+(\d+)\s+(.+)$").expect("counter pattern is valid"));

/// Accumulated traffic for one address, in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandwidthUsage {
    /// Bytes forwarded to the address
    pub bytes_in: u64,
    /// Bytes forwarded from the address
    pub bytes_out: u64,
}

impl BandwidthUsage {
    pub fn total(&self) -> u64 {
        self.bytes_in.saturating_add(self.bytes_out)
    }
}

fn validate_ip(ip: &str) -> Result<()> {
    ip.parse::<Ipv4Addr>()
        .map(|_| ())
        .map_err(|_| Error::InvalidAddress {
            address: ip.to_string(),
        })
}

impl VzClient {
    /// Start accounting traffic for `ip` by appending the paired FORWARD
    /// rules. Counting starts at zero for a newly added pair.
    pub async fn bandwidth_monitor_add(&mut self, ip: &str) -> Result<()> {
        validate_ip(ip)?;
        let commands = [
            format!("/sbin/iptables -A FORWARD -o eth0 -s {}", ip),
            format!("/sbin/iptables -A FORWARD -i eth0 -d {}", ip),
        ];
        for command in &commands {
            self.shell_execute(command).await?;
        }
        info!(ip, "bandwidth monitor added");
        Ok(())
    }

    /// Stop accounting traffic for `ip` by deleting the paired rules
    pub async fn bandwidth_monitor_remove(&mut self, ip: &str) -> Result<()> {
        validate_ip(ip)?;
        let commands = [
            format!("/sbin/iptables -D FORWARD -o eth0 -s {}", ip),
            format!("/sbin/iptables -D FORWARD -i eth0 -d {}", ip),
        ];
        for command in &commands {
            self.shell_execute(command).await?;
        }
        info!(ip, "bandwidth monitor removed");
        Ok(())
    }

    /// Read the accumulated counters for `ip`.
    ///
    /// Fails with a parse error when no counter line mentions the address,
    /// which usually means the monitor was never added.
    pub async fn bandwidth_usage(&mut self, ip: &str) -> Result<BandwidthUsage> {
        validate_ip(ip)?;
        let command = format!("/sbin/iptables -L FORWARD -v -x -n | grep {}", ip);
        let output = self.shell_execute(&command).await?;

        let mut usage = BandwidthUsage::default();
        let mut matched = false;
        for line in output.lines() {
            // Skip the echoed command line.
            if line.contains("iptables -L") {
                continue;
            }
            let caps = match COUNTER_RE.captures(line) {
                Some(caps) => caps,
                None => continue,
            };
            let bytes: u64 = caps[2].parse().unwrap_or(0);
            let rule = &caps[3];
            let mut columns = rule.split_whitespace().rev();
            let destination = columns.next().unwrap_or("");
            let source = columns.next().unwrap_or("");
            if destination == ip {
                usage.bytes_in = usage.bytes_in.saturating_add(bytes);
                matched = true;
            } else if source == ip {
                usage.bytes_out = usage.bytes_out.saturating_add(bytes);
                matched = true;
            }
        }
        if !matched {
            return Err(Error::ParseError {
                context: "bandwidth counters",
                output,
            });
        }
        Ok(usage)
    }

    /// Zero every FORWARD-chain counter on the node. Affects all monitored
    /// addresses, not just one.
    pub async fn bandwidth_counters_reset(&mut self) -> Result<()> {
        self.shell_execute("/sbin/iptables -Z").await?;
        info!("bandwidth counters reset");
        Ok(())
    }
}
