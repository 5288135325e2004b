// # Rule Provider Trait
//
// Defines the interface for reading and replacing source-based policy rules
// ("traffic from IP uses routing table TABLE").
//
// ## Implementations
//
// - [`IpRoute2RuleProvider`](crate::rules::IpRoute2RuleProvider): live rules via `ip rule`
// - [`DummyRuleProvider`](crate::rules::DummyRuleProvider): in-memory, no privileges needed
// - [`RulePersistence`](crate::persistence::RulePersistence): durable decorator over another provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One policy-routing rule
///
/// The table is an opaque name or number understood by the OS.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    /// Source IP the rule matches
    pub ip: String,
    /// Routing table traffic from `ip` is looked up in
    pub table: String,
}

impl Rule {
    /// Create a new rule
    pub fn new(ip: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            table: table.into(),
        }
    }
}

/// Trait for rule provider implementations
///
/// # Thread Safety
///
/// `set` calls must be serialized by the implementation: the replace sequence
/// for one IP may not interleave with another `set`. `rules` takes no lock and
/// may observe a `set` that is still in flight.
#[async_trait]
pub trait RuleProvider: Send + Sync {
    /// List the rules that are currently active
    ///
    /// Duplicates are returned as reported; nothing is deduplicated.
    async fn rules(&self) -> Result<Vec<Rule>, crate::Error>;

    /// Route traffic from `ip` through `table`
    ///
    /// Any rule already active for `ip` is removed first, so afterwards
    /// exactly one rule exists for `ip`.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The rule is active
    /// - `Err(Error)`: The replace failed. If the removal failed nothing was
    ///   added; if the add failed after a removal, `ip` has no rule until retried.
    async fn set(&self, ip: &str, table: &str) -> Result<(), crate::Error>;
}
