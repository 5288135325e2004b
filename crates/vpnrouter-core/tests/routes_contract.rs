//! Contract Test: Route Read Model
//!
//! Constraints verified:
//! - Backup names win over primary names for the same IP
//! - Static names win over both, keyed by MAC
//! - Every IP from primary or backup shows up exactly once
//! - Hosts without a rule are reported with the null table
//! - A route set through the router is reported back
//!
//! If this test fails, the web UI shows wrong hosts or wrong tables.

mod common;

use common::*;
use std::collections::HashSet;
use std::sync::Arc;
use vpnrouter_core::{DummyRuleProvider, Host, HostMerger, NULL_TABLE, Router, VpnRouter};

fn router(
    primary: Vec<Host>,
    backup: Vec<Host>,
    names: Vec<Host>,
    rules: DummyRuleProvider,
) -> VpnRouter {
    let merger = HostMerger::new(
        Box::new(MockHostSource::new(primary)),
        Box::new(MockHostSource::new(backup)),
        Box::new(MockHostSource::new(names)),
    );
    VpnRouter::new(Box::new(merger), Arc::new(rules))
}

#[tokio::test]
async fn backup_name_wins_over_primary() {
    let r = router(
        vec![Host::new("1", "1", "name1")],
        vec![Host::new("1", "1", "newname1")],
        vec![],
        DummyRuleProvider::new(),
    );

    let routes = r.routes().await.unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].lease.name, "newname1");
}

#[tokio::test]
async fn static_name_wins_over_everything() {
    let r = router(
        vec![host(1, "arp")],
        vec![host(1, "lease")],
        vec![Host::new(host(1, "").mac, "", "desk")],
        DummyRuleProvider::new(),
    );

    let routes = r.routes().await.unwrap();
    assert_eq!(routes[0].lease.name, "desk");
}

#[tokio::test]
async fn every_ip_appears_once() {
    let r = router(
        vec![Host::new("", "0.0.0.1", ""), Host::new("", "0.0.0.3", "")],
        vec![Host::new("", "0.0.0.1", ""), Host::new("", "0.0.0.4", "")],
        vec![],
        DummyRuleProvider::new(),
    );

    let routes = r.routes().await.unwrap();
    assert_eq!(routes.len(), 3);
    let ips: HashSet<_> = routes.iter().map(|r| r.ip.as_str()).collect();
    assert_eq!(ips, HashSet::from(["0.0.0.1", "0.0.0.3", "0.0.0.4"]));
}

#[tokio::test]
async fn unrouted_host_reports_null_table() {
    let r = router(
        vec![Host::new("", "10.0.0.5", "")],
        vec![],
        vec![],
        DummyRuleProvider::new(),
    );

    let routes = r.routes().await.unwrap();
    assert_eq!(routes[0].table, NULL_TABLE);
}

#[tokio::test]
async fn set_route_round_trips() {
    let rules = DummyRuleProvider::new();
    let r = router(vec![host(7, "tv")], vec![], vec![], rules.clone());

    r.set_route("10.0.0.7", "vpn").await.unwrap();

    let routes = r.routes().await.unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].table, "vpn");
    assert_eq!(routes[0].lease.name, "tv");
    assert_eq!(rules.len().await, 1);
}
