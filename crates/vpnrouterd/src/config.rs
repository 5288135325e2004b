//! Daemon configuration, read from `VPNROUTER_*` environment variables.

use anyhow::{Context, Result};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use vpnrouter_core::config::{MAX_COMMAND_TIMEOUT_SECS, parse_tables};
use vpnrouter_core::{HostSourcesConfig, RouterConfig, RuleProviderConfig, TableDef};

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
const DEFAULT_TABLES: &str = "null=Blocked,defgw=Default";
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 10;

/// Application configuration
#[derive(Debug)]
pub struct Config {
    pub listen: SocketAddr,
    pub web_dir: Option<PathBuf>,
    pub lease_file: PathBuf,
    pub arp_file: PathBuf,
    pub name_file: PathBuf,
    pub db_file: PathBuf,
    pub devices: Vec<String>,
    pub admin_ips: Vec<IpAddr>,
    pub api_tokens: Vec<String>,
    pub tables: Vec<TableDef>,
    pub debug: bool,
    pub ip_command: String,
    pub command_timeout_secs: u64,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = HostSourcesConfig::default();
        let path = |key: &str, default: &Path| {
            var(key)
                .map(PathBuf::from)
                .unwrap_or_else(|| default.to_path_buf())
        };

        let listen = var("VPNROUTER_LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen = listen
            .parse()
            .with_context(|| format!("VPNROUTER_LISTEN '{}' is not a socket address", listen))?;

        let admin_ips = split_list(&var("VPNROUTER_ADMIN_IPS").unwrap_or_else(|| "127.0.0.1".to_string()))
            .into_iter()
            .map(|ip| {
                ip.parse::<IpAddr>()
                    .with_context(|| format!("VPNROUTER_ADMIN_IPS entry '{}' is not an IP address", ip))
            })
            .collect::<Result<Vec<_>>>()?;

        let tables = var("VPNROUTER_TABLES").unwrap_or_else(|| DEFAULT_TABLES.to_string());
        let tables = parse_tables(&tables).context("VPNROUTER_TABLES")?;

        let debug = match var("VPNROUTER_DEBUG") {
            Some(value) => parse_bool(&value)
                .with_context(|| format!("VPNROUTER_DEBUG '{}' is not a boolean", value))?,
            None => false,
        };

        let command_timeout_secs = match var("VPNROUTER_COMMAND_TIMEOUT_SECS") {
            Some(value) => value.trim().parse().with_context(|| {
                format!("VPNROUTER_COMMAND_TIMEOUT_SECS '{}' is not a number", value)
            })?,
            None => DEFAULT_COMMAND_TIMEOUT_SECS,
        };

        Ok(Self {
            listen,
            web_dir: var("VPNROUTER_WEB_DIR")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            lease_file: path("VPNROUTER_LEASE_FILE", &defaults.lease_file),
            arp_file: path("VPNROUTER_ARP_FILE", &defaults.arp_file),
            name_file: path("VPNROUTER_NAME_FILE", &defaults.name_file),
            db_file: path("VPNROUTER_DB_FILE", Path::new("./db.txt")),
            devices: var("VPNROUTER_DEVICES")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.devices),
            admin_ips,
            api_tokens: var("VPNROUTER_API_TOKENS")
                .map(|s| split_list(&s))
                .unwrap_or_default(),
            tables,
            debug,
            ip_command: var("VPNROUTER_IP_COMMAND").unwrap_or_else(|| "ip".to_string()),
            command_timeout_secs,
            log_level: var("VPNROUTER_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Library-level view of this configuration
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            hosts: HostSourcesConfig {
                lease_file: self.lease_file.clone(),
                arp_file: self.arp_file.clone(),
                name_file: self.name_file.clone(),
                devices: self.devices.clone(),
            },
            rules: if self.debug {
                RuleProviderConfig::Dummy
            } else {
                RuleProviderConfig::IpRoute2 {
                    ip_command: self.ip_command.clone(),
                    timeout_secs: self.command_timeout_secs,
                }
            },
            db_file: self.db_file.clone(),
            tables: self.tables.clone(),
        }
    }

    /// Validate the configuration
    ///
    /// Besides value checks this opens the lease, ARP and name files, so a
    /// wrong path is reported at startup rather than on the first request.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_COMMAND_TIMEOUT_SECS).contains(&self.command_timeout_secs) {
            anyhow::bail!(
                "VPNROUTER_COMMAND_TIMEOUT_SECS must be between 1 and {} seconds. Got: {}",
                MAX_COMMAND_TIMEOUT_SECS,
                self.command_timeout_secs
            );
        }

        if self.devices.is_empty() {
            anyhow::bail!(
                "VPNROUTER_DEVICES must name at least one device. \
                Set it via: export VPNROUTER_DEVICES=eth0,eth1"
            );
        }

        self.router_config()
            .validate()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        if let Some(ref dir) = self.web_dir
            && !dir.is_dir()
        {
            anyhow::bail!("VPNROUTER_WEB_DIR is not a directory: {}", dir.display());
        }

        if let Some(parent) = self.db_file.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            anyhow::bail!(
                "VPNROUTER_DB_FILE parent directory does not exist: {}. \
                Create it first: sudo mkdir -p {}",
                parent.display(),
                parent.display()
            );
        }

        for (var, file) in [
            ("VPNROUTER_LEASE_FILE", &self.lease_file),
            ("VPNROUTER_ARP_FILE", &self.arp_file),
            ("VPNROUTER_NAME_FILE", &self.name_file),
        ] {
            std::fs::File::open(file)
                .with_context(|| format!("{} cannot be opened: {}", var, file.display()))?;
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "VPNROUTER_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
