//! Static MAC -> name file.
//!
//! A header line followed by `MAC Name` pairs. Names override whatever the
//! lease file says for the same MAC.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use vpnrouter_core::{Host, HostSource, Result};

/// Host source reading administrator-defined names
#[derive(Debug, Clone)]
pub struct StaticNameSource {
    path: PathBuf,
}

impl StaticNameSource {
    /// Create a source for the name file at `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl HostSource for StaticNameSource {
    async fn hosts(&self) -> Result<Vec<Host>> {
        let content = crate::read_source(&self.path).await?;
        Ok(parse_names(&content))
    }
}

/// Parse name file content, header line included
pub fn parse_names(content: &str) -> Vec<Host> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| match line.split_whitespace().collect::<Vec<_>>()[..] {
            [mac, name] => Some(Host::new(mac, "", name)),
            _ => None,
        })
        .collect()
}
