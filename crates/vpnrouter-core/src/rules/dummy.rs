// # Dummy Rule Provider
//
// In-memory implementation of RuleProvider.
//
// ## Purpose
//
// Stands in for the kernel rule table when running without `CAP_NET_ADMIN`
// (debug mode) and in tests. A map keyed by IP holds at most one table per
// IP, which is exactly the state `IpRoute2RuleProvider` converges to after a
// successful `set`.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::{Rule, RuleProvider};

/// In-memory rule provider
///
/// Cloning shares the underlying map. Rules are listed sorted by IP.
///
/// # Example
///
/// ```rust,no_run
/// use vpnrouter_core::{DummyRuleProvider, RuleProvider};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let rules = DummyRuleProvider::new();
///     rules.set("10.0.0.5", "vpn").await?;
///     assert_eq!(rules.rules().await?.len(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct DummyRuleProvider {
    inner: Arc<RwLock<BTreeMap<String, String>>>,
}

impl DummyRuleProvider {
    /// Create a new empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of rules
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if there are no rules
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl RuleProvider for DummyRuleProvider {
    async fn rules(&self) -> Result<Vec<Rule>, Error> {
        let guard = self.inner.read().await;
        Ok(guard
            .iter()
            .map(|(ip, table)| Rule::new(ip.clone(), table.clone()))
            .collect())
    }

    async fn set(&self, ip: &str, table: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(ip.to_string(), table.to_string());
        tracing::debug!(ip = %ip, table = %table, "Dummy rule set");
        Ok(())
    }
}
