//! Run-frequency store
//!
//! Persistent per-user counter of how often entries have been launched,
//! keyed by source path. Best-effort: callers log failures and carry on,
//! launching never depends on it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

const STORE_FILE: &str = "run-index.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Counters {
    runs: HashMap<String, u64>,
}

/// Run-frequency counters backed by a JSON file in the user cache
/// directory.
pub struct RunIndex {
    counters: Mutex<Counters>,
    store_path: PathBuf,
}

impl RunIndex {
    /// Open (or create) the store under `<cache_dir>/ade/run-index.json`.
    pub fn open() -> Result<Self> {
        let base = BaseDirs::new().context("failed to resolve user cache directory")?;
        let dir = base.cache_dir().join("ade");
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        Self::open_at(dir.join(STORE_FILE))
    }

    /// Open a store at an explicit path.
    pub fn open_at(store_path: PathBuf) -> Result<Self> {
        let counters = match std::fs::read_to_string(&store_path) {
            Ok(data) => {
                let counters: Counters =
                    serde_json::from_str(&data).context("failed to parse run index")?;
                debug!(
                    entries = counters.runs.len(),
                    "loaded run index from {}",
                    store_path.display()
                );
                counters
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Counters::default(),
            Err(e) => return Err(e).context("failed to read run index"),
        };

        Ok(Self {
            counters: Mutex::new(counters),
            store_path,
        })
    }

    /// Increase the run count for a path and persist the store.
    pub fn increment(&self, path: &str) -> Result<()> {
        let mut counters = self.counters.lock();
        *counters.runs.entry(path.to_string()).or_insert(0) += 1;
        self.save_locked(&counters)
    }

    /// Run count for a single path (0 if never run).
    pub fn frequency(&self, path: &str) -> u64 {
        self.counters.lock().runs.get(path).copied().unwrap_or(0)
    }

    /// Run counts for a set of paths; paths never run map to 0.
    pub fn frequencies(&self, paths: &[&str]) -> HashMap<String, u64> {
        let counters = self.counters.lock();
        paths
            .iter()
            .map(|&path| {
                (
                    path.to_string(),
                    counters.runs.get(path).copied().unwrap_or(0),
                )
            })
            .collect()
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    fn save_locked(&self, counters: &Counters) -> Result<()> {
        let data = serde_json::to_string_pretty(counters)?;
        std::fs::write(&self.store_path, data)
            .with_context(|| format!("failed to write {}", self.store_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunIndex::open_at(dir.path().join("run-index.json")).unwrap();

        store.increment("/usr/bin/firefox").unwrap();
        store.increment("/usr/bin/firefox").unwrap();
        store.increment("/usr/bin/gimp").unwrap();

        assert_eq!(store.frequency("/usr/bin/firefox"), 2);
        assert_eq!(store.frequency("/usr/bin/gimp"), 1);
        assert_eq!(store.frequency("/usr/bin/never"), 0);
    }

    #[test]
    fn frequencies_covers_unknown_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunIndex::open_at(dir.path().join("run-index.json")).unwrap();
        store.increment("/usr/bin/htop").unwrap();

        let freqs = store.frequencies(&["/usr/bin/htop", "/usr/bin/never"]);
        assert_eq!(freqs["/usr/bin/htop"], 1);
        assert_eq!(freqs["/usr/bin/never"], 0);
    }

    #[test]
    fn counts_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run-index.json");

        {
            let store = RunIndex::open_at(path.clone()).unwrap();
            store.increment("/usr/bin/firefox").unwrap();
        }
        let store = RunIndex::open_at(path).unwrap();
        assert_eq!(store.frequency("/usr/bin/firefox"), 1);
    }

    #[test]
    fn corrupt_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run-index.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(RunIndex::open_at(path).is_err());
    }
}
