//! Kernel ARP table reader.
//!
//! `/proc/net/arp` has a header line followed by six whitespace separated
//! columns per entry:
//!
//! ```text
//! IP address       HW type     Flags       HW address            Mask     Device
//! 10.10.10.1       0x1         0x2         00:01:02:03:04:05     *        br0
//! ```
//!
//! Only entries on the configured LAN devices are reported. ARP rows carry no
//! hostname.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use vpnrouter_core::{Host, HostSource, Result};

/// Host source reading the kernel ARP table
#[derive(Debug, Clone)]
pub struct ArpTableSource {
    path: PathBuf,
    devices: HashSet<String>,
}

impl ArpTableSource {
    /// Create a source for `path`, keeping entries on `devices`
    pub fn new<I, S>(path: impl AsRef<Path>, devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.as_ref().to_path_buf(),
            devices: devices.into_iter().map(Into::into).collect(),
        }
    }

    fn parse(&self, content: &str) -> Vec<Host> {
        content
            .lines()
            .skip(1)
            .filter_map(|line| {
                let parts: Vec<&str> = line.split_whitespace().collect();
                match parts.as_slice() {
                    [ip, _, _, mac, _, dev] if self.devices.contains(*dev) => {
                        Some(Host::new(*mac, *ip, ""))
                    }
                    _ => None,
                }
            })
            .collect()
    }
}

#[async_trait]
impl HostSource for ArpTableSource {
    async fn hosts(&self) -> Result<Vec<Host>> {
        let content = crate::read_source(&self.path).await?;
        Ok(self.parse(&content))
    }
}
