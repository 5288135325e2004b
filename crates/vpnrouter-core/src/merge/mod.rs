//! Host merging
//!
//! [`HostMerger`] folds three host sources into one canonical list:
//!
//! 1. Every host from the *primary* source is kept.
//! 2. A *backup* host with the same IP overrides the primary host's name.
//! 3. A *static-name* entry with the same MAC overrides the name again.
//!    Static entries with an empty MAC never match, even hosts whose MAC is
//!    also empty.
//! 4. Backup hosts whose IP never matched a primary host are appended.
//!
//! Primary-derived hosts come first in source order, followed by the unmatched
//! backup hosts in backup source order. If the backup source lists the same IP
//! more than once, its last entry is the one used.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

use crate::error::Result;
use crate::traits::{Host, HostSource};

/// Merges a primary, a backup and a static-name [`HostSource`]
///
/// The merger is itself a `HostSource`, so it can be handed to
/// [`VpnRouter`](crate::router::VpnRouter) like any single source.
///
/// # Example
///
/// ```rust,ignore
/// let hosts = HostMerger::new(
///     Box::new(arp),      // primary: who is on the wire right now
///     Box::new(leases),   // backup: names from the DHCP server
///     Box::new(names),    // static MAC -> name overrides
/// );
/// ```
pub struct HostMerger {
    primary: Box<dyn HostSource>,
    backup: Box<dyn HostSource>,
    static_names: Box<dyn HostSource>,
}

impl HostMerger {
    /// Create a merger from its three sources
    pub fn new(
        primary: Box<dyn HostSource>,
        backup: Box<dyn HostSource>,
        static_names: Box<dyn HostSource>,
    ) -> Self {
        Self {
            primary,
            backup,
            static_names,
        }
    }
}

#[async_trait]
impl HostSource for HostMerger {
    async fn hosts(&self) -> Result<Vec<Host>> {
        let primary = self.primary.hosts().await?;
        let backup = self.backup.hosts().await?;
        let static_names = self.static_names.hosts().await?;

        debug!(
            primary = primary.len(),
            backup = backup.len(),
            static_names = static_names.len(),
            "Merging host sources"
        );

        Ok(merge_hosts(primary, backup, &static_names))
    }
}

/// Merge already-fetched host lists
///
/// Pure function; see the module docs for the precedence rules.
pub fn merge_hosts(primary: Vec<Host>, backup: Vec<Host>, static_names: &[Host]) -> Vec<Host> {
    let names: HashMap<&str, &str> = static_names
        .iter()
        .filter(|h| !h.mac.is_empty())
        .map(|h| (h.mac.as_str(), h.name.as_str()))
        .collect();

    // IP -> index of the last backup entry with that IP
    let mut backup_by_ip: HashMap<String, usize> = HashMap::with_capacity(backup.len());
    for (idx, host) in backup.iter().enumerate() {
        backup_by_ip.insert(host.ip.clone(), idx);
    }

    let mut matched = vec![false; backup.len()];
    let mut hosts = Vec::with_capacity(primary.len() + backup.len());

    for mut host in primary {
        if let Some(&idx) = backup_by_ip.get(&host.ip) {
            host.name = backup[idx].name.clone();
            matched[idx] = true;
        }
        apply_static_name(&mut host, &names);
        hosts.push(host);
    }

    for (idx, mut host) in backup.into_iter().enumerate() {
        if matched[idx] || backup_by_ip.get(&host.ip) != Some(&idx) {
            continue;
        }
        apply_static_name(&mut host, &names);
        hosts.push(host);
    }

    hosts
}

fn apply_static_name(host: &mut Host, names: &HashMap<&str, &str>) {
    if let Some(name) = names.get(host.mac.as_str()) {
        host.name = (*name).to_string();
    }
}
