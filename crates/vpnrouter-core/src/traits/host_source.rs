// # Host Source Trait
//
// Defines the interface for anything that knows which devices live on the LAN.
//
// ## Implementations
//
// - dnsmasq lease file, ARP table, static MAC -> name file: `vpnrouter-hosts` crate
// - [`HostMerger`](crate::merge::HostMerger): combines three sources into one
//
// ## Usage
//
// ```rust,ignore
// use vpnrouter_core::HostSource;
//
// #[tokio::main]
// async fn main() -> vpnrouter_core::Result<()> {
//     let source = /* HostSource implementation */;
//     for host in source.hosts().await? {
//         println!("{} {} {}", host.ip, host.mac, host.name);
//     }
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One network device as seen by a host source
///
/// Any field may be empty: an ARP row has no name, a static-name row has no IP.
/// Hosts are recomputed on every query and never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Host {
    /// Hardware address, e.g. `00:11:22:33:44:55`
    pub mac: String,
    /// IP address as reported by the source
    pub ip: String,
    /// Hostname
    pub name: String,
}

impl Host {
    /// Create a new host
    pub fn new(mac: impl Into<String>, ip: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            mac: mac.into(),
            ip: ip.into(),
            name: name.into(),
        }
    }
}

/// Trait for host source implementations
///
/// A host source is a pure reader: it performs I/O to list hosts but never
/// merges, filters by routing state, or caches between calls.
///
/// # Thread Safety
///
/// Implementations must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait HostSource: Send + Sync {
    /// List all hosts currently known to this source
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Host>)`: The hosts, in source order
    /// - `Err(Error)`: If the underlying data could not be read
    async fn hosts(&self) -> Result<Vec<Host>, crate::Error>;
}
