//! dnsmasq lease file reader.
//!
//! Each lease line has five space separated fields:
//!
//! ```text
//! <expiry> <mac> <ip> <hostname> <client-id>
//! ```
//!
//! A device that renewed with a new IP shows up several times. Only the two
//! most recent leases per MAC are kept (later lines are newer), so a device
//! that just moved is still found under its previous address.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use vpnrouter_core::{Host, HostSource, Result};

/// Leases kept per MAC
const LEASES_PER_MAC: usize = 2;

/// Host source reading a dnsmasq lease file
#[derive(Debug, Clone)]
pub struct DnsmasqLeaseSource {
    path: PathBuf,
}

impl DnsmasqLeaseSource {
    /// Create a source for the lease file at `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl HostSource for DnsmasqLeaseSource {
    async fn hosts(&self) -> Result<Vec<Host>> {
        let content = crate::read_source(&self.path).await?;
        let hosts = parse_leases(&content);
        tracing::trace!("Read {} leases from {}", hosts.len(), self.path.display());
        Ok(hosts)
    }
}

/// Parse lease file content
///
/// Returns at most two hosts per MAC, newest first, sorted by hostname.
pub fn parse_leases(content: &str) -> Vec<Host> {
    let mut by_mac: BTreeMap<&str, Vec<Host>> = BTreeMap::new();
    for line in content.lines() {
        let parts: Vec<&str> = line.split(' ').collect();
        if parts.len() != 5 {
            continue;
        }
        by_mac
            .entry(parts[1])
            .or_default()
            .push(Host::new(parts[1], parts[2], parts[3]));
    }

    let mut leases: Vec<Host> = by_mac
        .into_values()
        .flat_map(|hosts| hosts.into_iter().rev().take(LEASES_PER_MAC))
        .collect();
    leases.sort_by(|a, b| a.name.cmp(&b.name));
    leases
}
