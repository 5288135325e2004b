// # vpnrouter-core
//
// Core library for per-host policy routing on a LAN gateway.
//
// ## Architecture Overview
//
// - **HostSource**: Trait for anything that yields known hosts (leases, ARP, static names)
// - **HostMerger**: Combines a primary, a backup and a static-name source into one host list
// - **RuleProvider**: Trait for reading and replacing `ip rule` entries (one rule per source IP)
// - **IpRoute2RuleProvider**: RuleProvider backed by the `ip` command
// - **DummyRuleProvider**: In-memory RuleProvider for dry runs and tests
// - **RulePersistence**: RuleProvider decorator owning the durable IP -> table mapping
// - **VpnRouter**: Joins hosts with rules into the `Route` read-model
//
// ## Composition
//
// ```text
// HostMerger(arp, leases, names) ──┐
//                                  ├──> VpnRouter ──> routes() / set_route()
// RulePersistence(IpRoute2) ───────┘
// ```
//
// Every component is injected through its constructor; nothing in this crate
// holds process-global state.

pub mod config;
pub mod error;
pub mod merge;
pub mod persistence;
pub mod router;
pub mod rules;
pub mod traits;

// Re-export core types for convenience
pub use config::{HostSourcesConfig, RouterConfig, RuleProviderConfig, TableDef};
pub use error::{Error, Result};
pub use merge::HostMerger;
pub use persistence::{ReplayReport, RulePersistence};
pub use router::{NULL_TABLE, Route, Router, VpnRouter};
pub use rules::{DummyRuleProvider, IpRoute2RuleProvider, validate_rule};
pub use traits::{Host, HostSource, Rule, RuleProvider};
