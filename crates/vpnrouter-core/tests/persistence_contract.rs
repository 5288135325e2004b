//! Contract Test: Durable Desired State
//!
//! Constraints verified:
//! - Desired rules survive a restart and a kernel reset
//! - Replay re-applies exactly the persisted mapping
//! - Replaying twice yields the same kernel state as replaying once
//! - A desired state that cannot be written is never applied
//! - A rejected change leaves the mapping and the snapshot untouched, so it
//!   cannot resurface after a restart
//!
//! If this test fails, routing choices are lost on reboot.

mod common;

use common::*;
use std::collections::BTreeMap;
use vpnrouter_core::{Error, IpRoute2RuleProvider, Rule, RulePersistence, RuleProvider};

fn persistent(fake: &FakeIpCommand, path: &std::path::Path) -> RulePersistence {
    RulePersistence::new(
        Box::new(IpRoute2RuleProvider::with_runner(Box::new(fake.clone()))),
        path,
    )
}

#[tokio::test]
async fn desired_state_survives_reboot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.txt");
    let fake = FakeIpCommand::new();

    {
        let rules = persistent(&fake, &path);
        rules.init().await.unwrap();
        rules.set("10.0.0.1", "vpn").await.unwrap();
        rules.set("10.0.0.2", "defgw").await.unwrap();
        rules.set("10.0.0.1", "null").await.unwrap();
    }

    fake.reboot();
    assert!(fake.installed().is_empty());

    let rules = persistent(&fake, &path);
    let report = rules.init().await.unwrap();

    assert_eq!(report.applied, 2);
    assert!(report.is_clean());

    let mut installed = fake.installed();
    installed.sort_by(|a, b| a.ip.cmp(&b.ip));
    assert_eq!(
        installed,
        vec![Rule::new("10.0.0.1", "null"), Rule::new("10.0.0.2", "defgw")]
    );
}

#[tokio::test]
async fn replay_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.txt");
    std::fs::write(&path, "IP\tTable\n10.0.0.1\tvpn\n10.0.0.2\tdefgw\n").unwrap();

    let fake = FakeIpCommand::new();
    let rules = persistent(&fake, &path);

    rules.init().await.unwrap();
    let once = fake.installed();
    rules.init().await.unwrap();
    let twice = fake.installed();

    assert_eq!(once.len(), 2);
    let as_set = |rules: Vec<Rule>| rules.into_iter().collect::<std::collections::HashSet<_>>();
    assert_eq!(as_set(once), as_set(twice));
}

#[tokio::test]
async fn snapshot_matches_desired_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.txt");
    let fake = FakeIpCommand::new();

    let rules = persistent(&fake, &path);
    rules.init().await.unwrap();
    rules.set("10.0.0.9", "vpn").await.unwrap();
    rules.set("10.0.0.10", "defgw").await.unwrap();

    let expected: BTreeMap<String, String> = [
        ("10.0.0.10".to_string(), "defgw".to_string()),
        ("10.0.0.9".to_string(), "vpn".to_string()),
    ]
    .into_iter()
    .collect();
    assert_eq!(rules.desired().await, expected);

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, "IP\tTable\n10.0.0.10\tdefgw\n10.0.0.9\tvpn\n");
}

#[tokio::test]
async fn unwritable_snapshot_blocks_os_change() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gone").join("db.txt");
    let fake = FakeIpCommand::new();

    let rules = persistent(&fake, &path);
    rules.init().await.unwrap();

    let err = rules.set("10.0.0.1", "vpn").await.unwrap_err();
    assert!(matches!(err, Error::Persistence(_)));
    assert_eq!(fake.add_call_count(), 0);
    assert!(rules.rules().await.unwrap().iter().all(|r| r.ip != "10.0.0.1"));
}

#[tokio::test]
async fn rejected_set_never_reaches_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.txt");
    let fake = FakeIpCommand::new();

    {
        let rules = persistent(&fake, &path);
        rules.init().await.unwrap();
        rules.set("10.0.0.5", "defgw").await.unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        // A table carrying a line break would add a second snapshot entry
        let err = rules.set("10.0.0.5", "vpn\n10.0.0.9\tnull").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        assert_eq!(rules.desired().await.len(), 1);
        assert_eq!(fake.installed_for("10.0.0.5"), vec![Rule::new("10.0.0.5", "defgw")]);
    }

    fake.reboot();
    let rules = persistent(&fake, &path);
    let report = rules.init().await.unwrap();

    assert_eq!(report.applied, 1);
    assert!(report.is_clean());
    assert!(fake.installed_for("10.0.0.9").is_empty());
    assert_eq!(fake.installed(), vec![Rule::new("10.0.0.5", "defgw")]);
}
