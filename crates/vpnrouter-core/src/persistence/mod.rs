// # Rule Persistence
//
// RuleProvider decorator that owns the *desired* IP -> table mapping.
//
// ## Purpose
//
// The kernel rule table only reflects what is active right now and is lost on
// reboot. `RulePersistence` keeps the administrator's intent in a snapshot file,
// replays it onto the wrapped provider at startup and rewrites it on every
// change, so the OS converges back to the last desired state after a restart.
//
// ## File Format
//
// ```text
// IP	Table
// 10.0.0.5	vpn
// 10.0.0.7	defgw
// ```
//
// The first line is a header and is ignored on load. Every other line holds an
// IP and a table separated by whitespace; lines that do not have exactly two
// fields are skipped. Entries are written sorted by IP.
//
// ## Write Policy
//
// - Atomic writes: the snapshot goes to a temporary file that is renamed over
//   the real one
// - Validate first: `set` rejects a bad IP or table before the mapping or the
//   file changes; entries loaded from disk are checked the same way
// - Persist first: `set` writes the snapshot before touching the OS; if the
//   write fails the in-memory entry is rolled back and the OS is left alone
// - Replay is best effort: a failing entry is logged and reported, the rest
//   are still applied

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::rules::validate_rule;
use crate::traits::{Rule, RuleProvider};

/// Header line written at the top of every snapshot
const SNAPSHOT_HEADER: &str = "IP\tTable";

/// Outcome of replaying the snapshot onto the wrapped provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Entries applied successfully
    pub applied: usize,
    /// Entries whose `set` failed, with the error message
    pub failed: Vec<(String, String)>,
}

impl ReplayReport {
    /// True if every entry was applied
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Durable rule provider decorator
///
/// Reads go straight to the wrapped provider; writes go to the snapshot file
/// and then to the wrapped provider, all under one lock.
///
/// # Lifecycle
///
/// 1. Create with [`RulePersistence::new()`]
/// 2. Call [`RulePersistence::init()`] once, before handing the provider out
/// 3. Use it as any other [`RuleProvider`]
///
/// # Example
///
/// ```rust,no_run
/// use vpnrouter_core::{DummyRuleProvider, RulePersistence, RuleProvider};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let rules = RulePersistence::new(Box::new(DummyRuleProvider::new()), "/var/lib/vpnrouter/db.txt");
///     let report = rules.init().await?;
///     println!("replayed {} rules", report.applied);
///
///     rules.set("10.0.0.5", "vpn").await?;
///     Ok(())
/// }
/// ```
pub struct RulePersistence {
    base: Box<dyn RuleProvider>,
    path: PathBuf,
    db: Mutex<BTreeMap<String, String>>,
}

impl RulePersistence {
    /// Wrap `base`, persisting the mapping at `path`
    pub fn new(base: Box<dyn RuleProvider>, path: impl AsRef<Path>) -> Self {
        Self {
            base,
            path: path.as_ref().to_path_buf(),
            db: Mutex::new(BTreeMap::new()),
        }
    }

    /// Load the snapshot and re-apply every entry to the wrapped provider
    ///
    /// A missing snapshot file is treated as an empty mapping (first start).
    /// Any other read error is returned and nothing is applied. Entries that
    /// fail validation are dropped and reported as failed.
    ///
    /// # Returns
    ///
    /// A [`ReplayReport`] listing the entries that could not be applied.
    pub async fn init(&self) -> Result<ReplayReport> {
        let mut db = self.db.lock().await;
        let loaded = load_snapshot(&self.path).await?;
        debug!("Loaded {} persisted rules from {}", loaded.len(), self.path.display());

        let mut report = ReplayReport::default();
        for (ip, table) in loaded {
            match validate_rule(&ip, &table) {
                Ok(()) => {
                    db.insert(ip, table);
                }
                Err(e) => {
                    warn!(ip = %ip, table = %table, "Dropping invalid persisted rule: {}", e);
                    report.failed.push((ip, e.to_string()));
                }
            }
        }

        for (ip, table) in db.iter() {
            match self.base.set(ip, table).await {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    warn!(ip = %ip, table = %table, "Failed to replay persisted rule: {}", e);
                    report.failed.push((ip.clone(), e.to_string()));
                }
            }
        }

        info!(
            applied = report.applied,
            failed = report.failed.len(),
            "Persisted rules replayed"
        );
        Ok(report)
    }

    /// Snapshot of the desired mapping
    pub async fn desired(&self) -> BTreeMap<String, String> {
        self.db.lock().await.clone()
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get path to temporary file for atomic writes
    ///
    /// The suffix is appended to the full file name so `db.txt` and `db.json`
    /// in one directory never share a temp file.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        self.path.with_file_name(format!("{}.tmp", name))
    }

    /// Write the mapping to disk atomically
    async fn write_snapshot(&self, db: &BTreeMap<String, String>) -> Result<()> {
        let content = render_snapshot(db);
        let temp_path = self.temp_path();

        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(content.as_bytes()).await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::persistence(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Snapshot written to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl RuleProvider for RulePersistence {
    async fn rules(&self) -> Result<Vec<Rule>> {
        self.base.rules().await
    }

    async fn set(&self, ip: &str, table: &str) -> Result<()> {
        validate_rule(ip, table)?;

        let mut db = self.db.lock().await;
        let previous = db.insert(ip.to_string(), table.to_string());

        if let Err(e) = self.write_snapshot(&db).await {
            match previous {
                Some(old) => db.insert(ip.to_string(), old),
                None => db.remove(ip),
            };
            error!(ip = %ip, table = %table, "Rule not applied, snapshot write failed: {}", e);
            return Err(e);
        }

        self.base.set(ip, table).await
    }
}

/// Read a snapshot file; a missing file yields an empty mapping
async fn load_snapshot(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("Snapshot file {} does not exist, starting empty", path.display());
            return Ok(BTreeMap::new());
        }
        Err(e) => {
            return Err(Error::persistence(format!(
                "Failed to read snapshot file {}: {}",
                path.display(),
                e
            )));
        }
    };
    Ok(parse_snapshot(&content))
}

/// Parse snapshot content, skipping the header and malformed lines
pub fn parse_snapshot(content: &str) -> BTreeMap<String, String> {
    let mut db = BTreeMap::new();
    for line in content.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if let [ip, table] = parts.as_slice() {
            db.insert((*ip).to_string(), (*table).to_string());
        } else if !parts.is_empty() {
            debug!("Skipping malformed snapshot line: {}", line);
        }
    }
    db
}

/// Render a mapping in snapshot format
pub fn render_snapshot(db: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(SNAPSHOT_HEADER.len() + 1 + db.len() * 24);
    out.push_str(SNAPSHOT_HEADER);
    out.push('\n');
    for (ip, table) in db {
        out.push_str(ip);
        out.push('\t');
        out.push_str(table);
        out.push('\n');
    }
    out
}
