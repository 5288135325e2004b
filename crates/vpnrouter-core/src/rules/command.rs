//! External command execution for rule providers.
//!
//! Commands are spawned directly (no shell), so arguments never need quoting.
//! Every invocation is bounded by a timeout; a child that outlives it is killed.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Result of a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// The exit code of the command (0 = success, -1 = killed by signal).
    pub exit_code: i32,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the combined output (stdout + stderr) for error messages.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Runs one fixed program with varying arguments.
///
/// [`IpRoute2RuleProvider`](super::IpRoute2RuleProvider) talks to the OS only
/// through this trait, which lets tests substitute a scripted `ip`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the program with `args`.
    ///
    /// # Returns
    ///
    /// * `Ok(CommandOutput)` - The command ran to completion (any exit code)
    /// * `Err(Error::CommandSpawn)` - The program could not be started
    /// * `Err(Error::CommandTimeout)` - The program did not finish in time
    async fn run(&self, args: &[&str]) -> Result<CommandOutput>;

    /// Human readable command line, used in logs and errors.
    fn command_line(&self, args: &[&str]) -> String;
}

/// [`CommandRunner`] backed by a real child process.
#[derive(Debug, Clone)]
pub struct SystemCommand {
    program: String,
    timeout: Duration,
}

impl SystemCommand {
    /// Create a runner for `program` (looked up in `PATH` unless absolute).
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// The configured per-invocation time limit.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl CommandRunner for SystemCommand {
    async fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let command = self.command_line(args);
        tracing::debug!(command = %command, "Executing command");

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| Error::CommandSpawn {
                command: command.clone(),
                source,
            })?,
            Err(_) => {
                tracing::warn!(command = %command, timeout = ?self.timeout, "Command timed out");
                return Err(Error::CommandTimeout {
                    command,
                    timeout: self.timeout,
                });
            }
        };

        let result = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };

        if result.success() {
            tracing::trace!(command = %command, "Command succeeded");
        } else {
            tracing::warn!(
                command = %command,
                exit_code = result.exit_code,
                stderr = %result.stderr,
                "Command failed"
            );
        }

        Ok(result)
    }

    fn command_line(&self, args: &[&str]) -> String {
        let mut line = self.program.clone();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_output() {
        let out = CommandOutput {
            exit_code: 1,
            stdout: "out".to_string(),
            stderr: String::new(),
        };
        assert_eq!(out.combined_output(), "out");

        let out = CommandOutput {
            exit_code: 1,
            stdout: "out".to_string(),
            stderr: "err".to_string(),
        };
        assert_eq!(out.combined_output(), "out\nerr");
        assert!(!out.success());
    }

    #[test]
    fn test_command_line() {
        let runner = SystemCommand::new("/sbin/ip", Duration::from_secs(1));
        assert_eq!(
            runner.command_line(&["rule", "add", "from", "10.0.0.1", "table", "vpn"]),
            "/sbin/ip rule add from 10.0.0.1 table vpn"
        );
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let runner = SystemCommand::new("/nonexistent/vpnrouter-ip", Duration::from_secs(1));
        let err = runner.run(&["rule", "show"]).await.unwrap_err();
        assert!(matches!(err, Error::CommandSpawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code_and_output_captured() {
        let runner = SystemCommand::new("sh", Duration::from_secs(5));
        let out = runner
            .run(&["-c", "echo hello; echo oops >&2; exit 3"])
            .await
            .unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout, "hello");
        assert_eq!(out.stderr, "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_command() {
        let runner = SystemCommand::new("sh", Duration::from_millis(100));
        let err = runner.run(&["-c", "sleep 5"]).await.unwrap_err();
        assert!(matches!(err, Error::CommandTimeout { .. }));
    }
}
