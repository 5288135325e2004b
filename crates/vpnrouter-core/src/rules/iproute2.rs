// # iproute2 Rule Provider
//
// Reads and replaces source-based policy rules through the `ip` command:
//
// - list:   `ip rule show`
// - add:    `ip rule add from <ip> table <table>`
// - delete: `ip rule del from <ip> table <table>`
//
// ## Replace semantics
//
// The kernel happily keeps several rules for one source IP (one per table),
// and the first matching one wins. Setting a new table therefore deletes every
// rule listed for the IP before adding the new one. A failed delete aborts the
// set before anything is added; a failed add after a successful delete leaves
// the IP without a rule and reports the add error.

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::command::{CommandOutput, CommandRunner, SystemCommand};
use crate::error::{Error, Result};
use crate::traits::{Rule, RuleProvider};

/// Default time limit for a single `ip` invocation
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Rule provider backed by the iproute2 `ip rule` command
///
/// Requires `CAP_NET_ADMIN` for `set`; `rules` works unprivileged.
pub struct IpRoute2RuleProvider {
    runner: Box<dyn CommandRunner>,
    set_lock: Mutex<()>,
}

impl IpRoute2RuleProvider {
    /// Create a provider running `ip_command` with the given time limit
    pub fn new(ip_command: impl Into<String>, timeout: Duration) -> Self {
        Self::with_runner(Box::new(SystemCommand::new(ip_command, timeout)))
    }

    /// Create a provider on top of an arbitrary command runner
    pub fn with_runner(runner: Box<dyn CommandRunner>) -> Self {
        Self {
            runner,
            set_lock: Mutex::new(()),
        }
    }

    async fn list(&self) -> Result<Vec<Rule>> {
        let output = self.runner.run(&["rule", "show"]).await?;
        if !output.success() {
            warn!(
                exit_code = output.exit_code,
                "'ip rule show' failed, treating rule list as empty: {}",
                output.combined_output()
            );
            return Ok(Vec::new());
        }
        Ok(parse_rules(&output.stdout))
    }

    async fn exec(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self.runner.run(args).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(Error::CommandFailed {
                command: self.runner.command_line(args),
                exit_code: output.exit_code,
                output: output.combined_output(),
            })
        }
    }
}

impl Default for IpRoute2RuleProvider {
    fn default() -> Self {
        Self::new("ip", DEFAULT_COMMAND_TIMEOUT)
    }
}

#[async_trait]
impl RuleProvider for IpRoute2RuleProvider {
    async fn rules(&self) -> Result<Vec<Rule>> {
        self.list().await
    }

    async fn set(&self, ip: &str, table: &str) -> Result<()> {
        validate_rule(ip, table)?;

        let _guard = self.set_lock.lock().await;

        let stale: Vec<Rule> = self
            .list()
            .await?
            .into_iter()
            .filter(|rule| rule.ip == ip)
            .collect();

        for old in &stale {
            self.exec(&["rule", "del", "from", ip, "table", old.table.as_str()])
                .await?;
            debug!(ip = %ip, table = %old.table, "Removed stale policy rule");
        }

        self.exec(&["rule", "add", "from", ip, "table", table])
            .await?;

        info!(ip = %ip, table = %table, replaced = stale.len(), "Policy rule applied");
        Ok(())
    }
}

/// Parse `ip rule show` output
///
/// Fields are whitespace separated; the third is the source and the fifth the
/// table (`32765:  from 10.0.0.2 lookup vpn`). Lines with fewer than five
/// fields are skipped.
pub fn parse_rules(output: &str) -> Vec<Rule> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 5 {
                if !parts.is_empty() {
                    debug!("Skipping short rule line: {}", line.trim());
                }
                return None;
            }
            Some(Rule::new(parts[2], parts[4]))
        })
        .collect()
}

/// Check an IP/table pair before it reaches `ip` or the snapshot file
///
/// Only IPv4 sources are accepted: `ip rule show` without a family flag lists
/// IPv4 rules only, so IPv6 rules could never be replaced. Table names must not
/// look like an option or contain whitespace or control characters, which
/// would break the one-rule-per-line snapshot format.
pub fn validate_rule(ip: &str, table: &str) -> Result<()> {
    if ip.parse::<Ipv4Addr>().is_err() {
        return Err(Error::invalid_input(format!("not an IPv4 address: '{}'", ip)));
    }
    if table.is_empty()
        || table.starts_with('-')
        || table.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(Error::invalid_input(format!("invalid table name: '{}'", table)));
    }
    Ok(())
}
