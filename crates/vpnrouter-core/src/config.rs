//! Configuration types for vpnrouter
//!
//! This module defines the configuration structures shared by the daemon and
//! the library crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::rules::{DummyRuleProvider, IpRoute2RuleProvider};
use crate::traits::RuleProvider;

/// Upper bound for the per-command timeout, in seconds
pub const MAX_COMMAND_TIMEOUT_SECS: u64 = 300;

/// Main router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Host source files
    pub hosts: HostSourcesConfig,

    /// OS rule backend
    #[serde(default)]
    pub rules: RuleProviderConfig,

    /// Snapshot file of the desired IP -> table mapping
    pub db_file: PathBuf,

    /// Routing tables offered to clients
    pub tables: Vec<TableDef>,
}

impl RouterConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.db_file.as_os_str().is_empty() {
            return Err(crate::Error::config("Snapshot file path cannot be empty"));
        }
        if self.tables.is_empty() {
            return Err(crate::Error::config("No routing tables configured"));
        }
        for table in &self.tables {
            table.validate()?;
        }

        self.hosts.validate()?;
        self.rules.validate()?;

        Ok(())
    }
}

/// Rule provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleProviderConfig {
    /// Shell out to iproute2
    IpRoute2 {
        /// Program name or path of `ip`
        ip_command: String,
        /// Per-invocation timeout in seconds
        timeout_secs: u64,
    },

    /// In-memory rules, no OS changes
    Dummy,
}

impl RuleProviderConfig {
    /// Validate the rule provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            RuleProviderConfig::IpRoute2 {
                ip_command,
                timeout_secs,
            } => {
                if ip_command.trim().is_empty() {
                    return Err(crate::Error::config("ip command cannot be empty"));
                }
                if *timeout_secs == 0 || *timeout_secs > MAX_COMMAND_TIMEOUT_SECS {
                    return Err(crate::Error::config(format!(
                        "Command timeout must be between 1 and {} seconds, got {}",
                        MAX_COMMAND_TIMEOUT_SECS, timeout_secs
                    )));
                }
                Ok(())
            }
            RuleProviderConfig::Dummy => Ok(()),
        }
    }

    /// Instantiate the configured provider
    pub fn build(&self) -> Box<dyn RuleProvider> {
        match self {
            RuleProviderConfig::IpRoute2 {
                ip_command,
                timeout_secs,
            } => Box::new(IpRoute2RuleProvider::new(
                ip_command.clone(),
                Duration::from_secs(*timeout_secs),
            )),
            RuleProviderConfig::Dummy => Box::new(DummyRuleProvider::new()),
        }
    }
}

impl Default for RuleProviderConfig {
    fn default() -> Self {
        RuleProviderConfig::IpRoute2 {
            ip_command: "ip".to_string(),
            timeout_secs: crate::rules::iproute2::DEFAULT_COMMAND_TIMEOUT.as_secs(),
        }
    }
}

/// Host source file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSourcesConfig {
    /// dnsmasq lease file
    pub lease_file: PathBuf,
    /// ARP table, normally `/proc/net/arp`
    pub arp_file: PathBuf,
    /// Static `MAC Name` file
    pub name_file: PathBuf,
    /// LAN devices whose ARP entries are considered
    pub devices: Vec<String>,
}

impl HostSourcesConfig {
    /// Validate the host source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        for (what, path) in [
            ("lease file", &self.lease_file),
            ("ARP file", &self.arp_file),
            ("name file", &self.name_file),
        ] {
            if path.as_os_str().is_empty() {
                return Err(crate::Error::config(format!("{} path cannot be empty", what)));
            }
        }
        if self.devices.is_empty() {
            return Err(crate::Error::config("No LAN devices configured"));
        }
        Ok(())
    }
}

impl Default for HostSourcesConfig {
    fn default() -> Self {
        Self {
            lease_file: PathBuf::from("/var/lib/misc/dnsmasq.leases"),
            arp_file: PathBuf::from("/proc/net/arp"),
            name_file: PathBuf::from("./names.txt"),
            devices: vec!["eth0".to_string(), "eth1".to_string()],
        }
    }
}

/// A routing table a client may choose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    /// Kernel table name, e.g. `defgw`
    pub name: String,
    /// Label shown to users
    pub text: String,
}

impl TableDef {
    /// Create a new table definition
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Validate the table definition
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.name.is_empty() {
            return Err(crate::Error::config("Table name cannot be empty"));
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(crate::Error::config(format!(
                "Table name '{}' contains whitespace",
                self.name
            )));
        }
        Ok(())
    }
}

/// Parse a `name=Label,name=Label` table list
///
/// Entries without `=` are skipped with a warning.
///
/// # Returns
///
/// - `Ok(Vec<TableDef>)`: The tables in input order
/// - `Err(Error::Config)`: If no entry could be parsed
pub fn parse_tables(input: &str) -> Result<Vec<TableDef>, crate::Error> {
    let mut tables = Vec::new();
    for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match entry.split_once('=') {
            Some((name, text)) => tables.push(TableDef::new(name.trim(), text.trim())),
            None => tracing::warn!("Ignoring table definition without '=': {}", entry),
        }
    }

    if tables.is_empty() {
        return Err(crate::Error::config(format!(
            "No valid table definitions in '{}'",
            input
        )));
    }
    Ok(tables)
}
