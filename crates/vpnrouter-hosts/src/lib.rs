// # File-backed Host Sources
//
// This crate provides the three `HostSource` implementations a gateway
// normally combines:
//
// - [`ArpTableSource`]: hosts currently on the wire (`/proc/net/arp`)
// - [`DnsmasqLeaseSource`]: hostnames handed out by dnsmasq
// - [`StaticNameSource`]: administrator-maintained MAC -> name overrides
//
// ## Behavior
//
// Every call to `hosts()` re-reads its file; nothing is cached. Lines that do
// not match the expected shape are skipped silently. A file that cannot be read
// is reported as `Error::HostSource` naming the path.

use std::path::Path;
use vpnrouter_core::{Error, Result};

pub mod arp;
pub mod dnsmasq;
pub mod static_names;

pub use arp::ArpTableSource;
pub use dnsmasq::DnsmasqLeaseSource;
pub use static_names::StaticNameSource;

/// Read a whole source file
async fn read_source(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::host_source(format!("Failed to read {}: {}", path.display(), e)))
}
