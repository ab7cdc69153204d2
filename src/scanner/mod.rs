//! Scanner pipeline
//!
//! Coordinates the executable and desktop-entry producers, merges their
//! candidates, and installs the finished table into the shared index. A
//! re-index cancels any in-flight scan cooperatively and supersedes it; the
//! superseded scan never installs its table, so readers always see either
//! the pre- or post-scan snapshot atomically.

pub mod desktop;
pub mod executable;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::index::{Entry, Index};

/// Capacity of the producer -> merger candidate channel.
const CANDIDATE_CHANNEL_CAP: usize = 100;

/// Coordinates scan runs and owns the cancellation slot for the currently
/// active scan.
pub struct Indexer {
    index: Arc<Index>,
    config: ScanConfig,
    active_scan: Mutex<Option<Arc<AtomicBool>>>,
}

impl Indexer {
    pub fn new(index: Arc<Index>, config: ScanConfig) -> Self {
        Self {
            index,
            config,
            active_scan: Mutex::new(None),
        }
    }

    /// Rebuild the index from the given roots, or from the configured scan
    /// paths if `None`. Cancels and supersedes any scan already running.
    /// Returns the live index count once this scan has settled.
    pub async fn reindex(&self, roots: Option<Vec<PathBuf>>) -> usize {
        let roots = roots.unwrap_or_else(|| self.config.paths.clone());
        let cancel = Arc::new(AtomicBool::new(false));
        {
            let mut slot = self.active_scan.lock();
            if let Some(previous) = slot.replace(cancel.clone()) {
                debug!("cancelling in-flight scan");
                previous.store(true, Ordering::Relaxed);
            }
        }

        info!(roots = roots.len(), "starting index scan");
        let staged = self.run_scan(roots, cancel.clone()).await;

        if cancel.load(Ordering::Relaxed) {
            debug!(
                candidates = staged.len(),
                "scan superseded, discarding staged table"
            );
            return self.index.count();
        }

        self.index.replace_all(staged);
        let count = self.index.count();
        info!(entries = count, "index installed");
        count
    }

    /// Cancel the active scan, if any. Used during daemon shutdown.
    pub fn stop(&self) {
        if let Some(cancel) = self.active_scan.lock().take() {
            cancel.store(true, Ordering::Relaxed);
        }
    }

    /// Run the producers and drain them into a staged candidate list, in
    /// arrival order.
    async fn run_scan(&self, roots: Vec<PathBuf>, cancel: Arc<AtomicBool>) -> Vec<Entry> {
        let (tx, mut rx) = mpsc::channel(CANDIDATE_CHANNEL_CAP);
        let mut producers = Vec::new();

        for chunk in partition(roots, self.config.workers.max(1)) {
            let tx = tx.clone();
            let cancel = cancel.clone();
            producers.push(tokio::task::spawn_blocking(move || {
                executable::scan_roots(&chunk, &cancel, &tx);
            }));
        }
        {
            let tx = tx.clone();
            let cancel = cancel.clone();
            let locations = self.config.desktop_paths.clone();
            producers.push(tokio::task::spawn_blocking(move || {
                desktop::scan_locations(&locations, &cancel, &tx);
            }));
        }
        // The merger sees channel close once every producer has dropped
        // its sender.
        drop(tx);

        let mut staged = Vec::new();
        while let Some(entry) = rx.recv().await {
            staged.push(entry);
        }
        for producer in producers {
            if let Err(e) = producer.await {
                warn!("scanner task failed: {e}");
            }
        }
        staged
    }
}

/// Split `roots` into at most `workers` round-robin chunks, one per
/// blocking task.
fn partition(roots: Vec<PathBuf>, workers: usize) -> Vec<Vec<PathBuf>> {
    let buckets = workers.min(roots.len()).max(1);
    let mut chunks: Vec<Vec<PathBuf>> = vec![Vec::new(); buckets];
    for (i, root) in roots.into_iter().enumerate() {
        chunks[i % buckets].push(root);
    }
    chunks.retain(|c| !c.is_empty());
    chunks
}
