//! Error types for vpnrouter
//!
//! This module defines all error types used throughout the crate.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for vpnrouter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vpnrouter
#[derive(Error, Debug)]
pub enum Error {
    /// An external command could not be started
    #[error("Failed to execute command '{command}': {source}")]
    CommandSpawn {
        /// The command line that failed to start
        command: String,
        /// The underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// An external command exited with a nonzero status
    #[error("Command failed: '{command}' (exit code {exit_code}): {output}")]
    CommandFailed {
        /// The command line
        command: String,
        /// Exit code, -1 if killed by a signal
        exit_code: i32,
        /// Combined stdout/stderr output
        output: String,
    },

    /// An external command did not finish in time
    #[error("Command timed out after {timeout:?}: '{command}'")]
    CommandTimeout {
        /// The command line
        command: String,
        /// The configured limit
        timeout: Duration,
    },

    /// Snapshot file errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Host source errors
    #[error("Host source error: {0}")]
    HostSource(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a host source error
    pub fn host_source(msg: impl Into<String>) -> Self {
        Self::HostSource(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether the error came from running an external command
    pub fn is_command_error(&self) -> bool {
        matches!(
            self,
            Self::CommandSpawn { .. } | Self::CommandFailed { .. } | Self::CommandTimeout { .. }
        )
    }
}
