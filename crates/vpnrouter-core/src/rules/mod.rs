// # Rule Provider Implementations
//
// This module provides implementations of the RuleProvider trait for
// different backends.

pub mod command;
pub mod dummy;
pub mod iproute2;

pub use command::{CommandOutput, CommandRunner, SystemCommand};
pub use dummy::DummyRuleProvider;
pub use iproute2::{IpRoute2RuleProvider, parse_rules, validate_rule};
