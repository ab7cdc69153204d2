//! Executable scanner
//!
//! Walks scan roots and emits a candidate for every regular file with an
//! execute bit set. Runs on blocking tasks; candidates flow to the merging
//! stage over a bounded channel.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::index::Entry;

/// Scan the given roots, sending one candidate per executable file.
///
/// Unreadable directories are skipped silently. The cancel flag is checked
/// between directory entries; a cancelled scan returns early. A closed
/// channel also stops the scan (the merging stage went away).
pub fn scan_roots(roots: &[PathBuf], cancel: &AtomicBool, tx: &mpsc::Sender<Entry>) {
    for root in roots {
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        debug!("scanning executables in {}", root.display());
        if !scan_root(root, cancel, tx) {
            return;
        }
    }
}

/// Returns false when the scan should stop entirely (cancelled or the
/// receiver is gone).
fn scan_root(root: &Path, cancel: &AtomicBool, tx: &mpsc::Sender<Entry>) -> bool {
    for dent in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if cancel.load(Ordering::Relaxed) {
            return false;
        }
        if !dent.file_type().is_file() {
            continue;
        }
        let name = dent.file_name().to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        let Ok(metadata) = dent.metadata() else {
            continue;
        };
        if metadata.permissions().mode() & 0o111 == 0 {
            continue;
        }

        trace!("found executable {}", dent.path().display());
        let entry = Entry::executable(name.into_owned(), dent.into_path());
        if tx.blocking_send(entry).is_err() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::OpenOptionsExt;

    fn write_file(path: &Path, mode: u32) {
        use std::io::Write;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .mode(mode)
            .open(path)
            .unwrap();
        writeln!(file, "#!/bin/sh\necho test").unwrap();
    }

    async fn collect(roots: Vec<PathBuf>) -> Vec<Entry> {
        let (tx, mut rx) = mpsc::channel(100);
        let handle = tokio::task::spawn_blocking(move || {
            let cancel = AtomicBool::new(false);
            scan_roots(&roots, &cancel, &tx);
        });

        let mut entries = Vec::new();
        handle.await.unwrap();
        while let Ok(entry) = rx.try_recv() {
            entries.push(entry);
        }
        entries
    }

    #[tokio::test]
    async fn emits_executables_and_skips_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("tool"), 0o755);
        write_file(&dir.path().join("notes.txt"), 0o644);
        write_file(&dir.path().join(".hidden"), 0o755);

        let entries = collect(vec![dir.path().to_path_buf()]).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "tool");
        assert_eq!(entries[0].exec, entries[0].path.to_string_lossy());
        assert!(!entries[0].is_desktop);
        assert!(!entries[0].terminal);
    }

    #[tokio::test]
    async fn walks_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("nested");
        fs::create_dir(&sub).unwrap();
        write_file(&sub.join("deep-tool"), 0o700);

        let entries = collect(vec![dir.path().to_path_buf()]).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "deep-tool");
    }

    #[tokio::test]
    async fn missing_root_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("tool"), 0o755);

        let entries = collect(vec![
            PathBuf::from("/nonexistent/ade-indexd-test"),
            dir.path().to_path_buf(),
        ])
        .await;
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn cancelled_scan_emits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("tool"), 0o755);

        let (tx, mut rx) = mpsc::channel(100);
        let root = dir.path().to_path_buf();
        tokio::task::spawn_blocking(move || {
            let cancel = AtomicBool::new(true);
            scan_roots(&[root], &cancel, &tx);
        })
        .await
        .unwrap();

        assert!(rx.try_recv().is_err());
    }
}
