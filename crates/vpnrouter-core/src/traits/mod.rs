//! Core traits for vpnrouter
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`HostSource`]: Produce the list of known hosts
//! - [`RuleProvider`]: Read and replace policy-routing rules

pub mod host_source;
pub mod rule_provider;

pub use host_source::{Host, HostSource};
pub use rule_provider::{Rule, RuleProvider};
