// # Router
//
// Joins the merged host list with the active policy rules into the `Route`
// read model served by the API.
//
// ## Behavior
//
// - Every host yields exactly one route, in host order
// - A host without a rule gets the [`NULL_TABLE`] sentinel
// - `set_route` does not check that the IP belongs to a known host

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::traits::{Host, HostSource, RuleProvider};

/// Table name reported for hosts with no policy rule
pub const NULL_TABLE: &str = "null";

/// A host together with the table its traffic is routed through
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Host IP, same as `lease.ip`
    pub ip: String,
    /// Active table or [`NULL_TABLE`]
    pub table: String,
    /// The host this route was built from
    pub lease: Host,
}

/// Read/write surface consumed by the HTTP layer
#[async_trait]
pub trait Router: Send + Sync {
    /// All known hosts with their current table
    async fn routes(&self) -> Result<Vec<Route>>;

    /// Route traffic from `ip` through `table`
    async fn set_route(&self, ip: &str, table: &str) -> Result<()>;
}

/// Default [`Router`] over a host source and a rule provider
pub struct VpnRouter {
    hosts: Box<dyn HostSource>,
    rules: Arc<dyn RuleProvider>,
}

impl VpnRouter {
    /// Create a router
    ///
    /// # Parameters
    ///
    /// * `hosts` - Source of hosts, normally a [`HostMerger`](crate::HostMerger)
    /// * `rules` - Rule provider, normally a [`RulePersistence`](crate::RulePersistence)
    pub fn new(hosts: Box<dyn HostSource>, rules: Arc<dyn RuleProvider>) -> Self {
        Self { hosts, rules }
    }
}

#[async_trait]
impl Router for VpnRouter {
    async fn routes(&self) -> Result<Vec<Route>> {
        let hosts = self.hosts.hosts().await?;
        let rules = self.rules.rules().await?;

        let tables: HashMap<String, String> =
            rules.into_iter().map(|rule| (rule.ip, rule.table)).collect();

        let routes = hosts
            .into_iter()
            .map(|host| Route {
                ip: host.ip.clone(),
                table: tables
                    .get(&host.ip)
                    .cloned()
                    .unwrap_or_else(|| NULL_TABLE.to_string()),
                lease: host,
            })
            .collect();

        Ok(routes)
    }

    async fn set_route(&self, ip: &str, table: &str) -> Result<()> {
        tracing::debug!(ip = %ip, table = %table, "Setting route");
        self.rules.set(ip, table).await
    }
}
