//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal stand-ins for the OS (`ip` binary) and for
//! host sources, so the contracts can be checked without privileges.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use vpnrouter_core::error::Result;
use vpnrouter_core::rules::{CommandOutput, CommandRunner};
use vpnrouter_core::{Host, HostSource, Rule};

/// Rules every Linux box starts with
const BUILTIN_RULES: &str = "0:\tfrom all lookup local\n32766:\tfrom all lookup main\n32767:\tfrom all lookup default";

/// A scripted `ip` binary keeping its own kernel rule list
///
/// Duplicate rules for one IP are allowed, as on a real kernel.
#[derive(Clone, Default)]
pub struct FakeIpCommand {
    kernel: Arc<Mutex<Vec<Rule>>>,
    /// Call counter for `rule add`
    add_calls: Arc<AtomicUsize>,
    /// Call counter for `rule del`
    del_calls: Arc<AtomicUsize>,
    /// IP whose `rule del` fails
    fail_del_for: Option<String>,
}

impl FakeIpCommand {
    /// Create a fake with an empty rule list
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fake seeded with rules
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        let fake = Self::new();
        *fake.kernel.lock().unwrap() = rules;
        fake
    }

    /// Make `rule del` fail for one IP
    pub fn failing_delete_for(mut self, ip: &str) -> Self {
        self.fail_del_for = Some(ip.to_string());
        self
    }

    /// Rules currently installed
    pub fn installed(&self) -> Vec<Rule> {
        self.kernel.lock().unwrap().clone()
    }

    /// Installed rules for one IP
    pub fn installed_for(&self, ip: &str) -> Vec<Rule> {
        self.installed().into_iter().filter(|r| r.ip == ip).collect()
    }

    /// Simulate a reboot: all custom rules are gone
    pub fn reboot(&self) {
        self.kernel.lock().unwrap().clear();
    }

    /// Get the number of `rule add` calls
    pub fn add_call_count(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    /// Get the number of `rule del` calls
    pub fn del_call_count(&self) -> usize {
        self.del_calls.load(Ordering::SeqCst)
    }

    fn ok(stdout: String) -> CommandOutput {
        CommandOutput {
            exit_code: 0,
            stdout,
            stderr: String::new(),
        }
    }

    fn fail(stderr: &str) -> CommandOutput {
        CommandOutput {
            exit_code: 2,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeIpCommand {
    async fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        // Give concurrent callers a chance to interleave
        tokio::task::yield_now().await;

        match args {
            ["rule", "show"] => {
                let mut out = String::from(BUILTIN_RULES);
                for (i, rule) in self.kernel.lock().unwrap().iter().enumerate() {
                    out.push_str(&format!(
                        "\n{}:\tfrom {} lookup {}",
                        32000 + i,
                        rule.ip,
                        rule.table
                    ));
                }
                Ok(Self::ok(out))
            }
            ["rule", "add", "from", ip, "table", table] => {
                self.add_calls.fetch_add(1, Ordering::SeqCst);
                self.kernel.lock().unwrap().push(Rule::new(*ip, *table));
                Ok(Self::ok(String::new()))
            }
            ["rule", "del", "from", ip, "table", table] => {
                self.del_calls.fetch_add(1, Ordering::SeqCst);
                if self.fail_del_for.as_deref() == Some(*ip) {
                    return Ok(Self::fail("RTNETLINK answers: Operation not permitted"));
                }
                let mut kernel = self.kernel.lock().unwrap();
                match kernel.iter().position(|r| r.ip == *ip && r.table == *table) {
                    Some(pos) => {
                        kernel.remove(pos);
                        Ok(Self::ok(String::new()))
                    }
                    None => Ok(Self::fail("RTNETLINK answers: No such file or directory")),
                }
            }
            _ => Ok(Self::fail("Command line is not complete. Try option \"help\"")),
        }
    }

    fn command_line(&self, args: &[&str]) -> String {
        format!("ip {}", args.join(" "))
    }
}

/// A host source returning a fixed list
#[derive(Clone)]
pub struct MockHostSource {
    hosts: Vec<Host>,
    /// Call counter for hosts()
    call_count: Arc<AtomicUsize>,
}

impl MockHostSource {
    /// Create a source returning `hosts`
    pub fn new(hosts: Vec<Host>) -> Self {
        Self {
            hosts,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create an empty source
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Get the number of times hosts() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostSource for MockHostSource {
    async fn hosts(&self) -> Result<Vec<Host>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.hosts.clone())
    }
}

/// Shorthand for a host with IP and MAC derived from one number
pub fn host(n: u8, name: &str) -> Host {
    Host::new(format!("00:00:00:00:00:{:02x}", n), format!("10.0.0.{}", n), name)
}
