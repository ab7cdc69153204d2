//! Application catalog
//!
//! Thread-safe in-memory catalog of launchable entries keyed by a
//! monotonically assigned 64-bit ID. Shared between all connection handlers
//! and the scanner merging stage behind an `Arc`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

/// A single indexed application entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Unique identifier, assigned on insertion
    pub id: u64,
    /// Default display name
    pub name: String,
    /// Localized display names (locale tag -> name)
    pub localized_names: HashMap<String, String>,
    /// Path to the executable or .desktop file
    pub path: PathBuf,
    /// Command line to spawn
    pub exec: String,
    /// Whether to run inside a terminal emulator
    pub terminal: bool,
    /// Application categories
    pub categories: Vec<String>,
    /// Whether this entry came from a .desktop file
    pub is_desktop: bool,
}

impl Entry {
    /// Create an entry for a plain executable file. The command line is the
    /// path itself.
    pub fn executable(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id: 0,
            name: name.into(),
            localized_names: HashMap::new(),
            exec: path.to_string_lossy().into_owned(),
            path,
            terminal: false,
            categories: Vec::new(),
            is_desktop: false,
        }
    }

    /// Display name for the given locale tag.
    ///
    /// Tries the exact tag first, then the language part before `_` or `-`,
    /// and falls back to the default name.
    pub fn display_name(&self, locale: &str) -> &str {
        if locale.is_empty() {
            return &self.name;
        }
        if let Some(name) = self.localized_names.get(locale) {
            return name;
        }
        if let Some(lang) = locale.split(['_', '-']).next() {
            if lang != locale {
                if let Some(name) = self.localized_names.get(lang) {
                    return name;
                }
            }
        }
        &self.name
    }
}

struct Table {
    entries: HashMap<u64, Arc<Entry>>,
    next_id: u64,
}

impl Table {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 1,
        }
    }

    fn insert(&mut self, mut entry: Entry) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        entry.id = id;
        self.entries.insert(id, Arc::new(entry));
        id
    }
}

/// Thread-safe entry catalog.
///
/// Writes (add, replace) are rare compared to reads, so a single
/// reader-writer lock over the whole table is sufficient. Readers never
/// observe a half-populated entry: entries are built before insertion and
/// `replace_all` swaps the entire table under the write lock.
pub struct Index {
    table: RwLock<Table>,
}

impl Index {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table::new()),
        }
    }

    /// Add an entry, assigning the next ID. Returns the assigned ID.
    pub fn add(&self, entry: Entry) -> u64 {
        self.table.write().insert(entry)
    }

    /// Look up an entry by ID.
    pub fn get(&self, id: u64) -> Option<Arc<Entry>> {
        self.table.read().entries.get(&id).cloned()
    }

    /// Consistent view of all entries, iterable without holding the lock.
    /// No iteration order is guaranteed.
    pub fn snapshot(&self) -> Vec<Arc<Entry>> {
        self.table.read().entries.values().cloned().collect()
    }

    /// Number of live entries.
    pub fn count(&self) -> usize {
        self.table.read().entries.len()
    }

    /// Atomically swap in a fresh table built from `entries`, resetting the
    /// ID counter to 1. IDs are assigned in the order given.
    pub fn replace_all(&self, entries: Vec<Entry>) {
        let mut table = Table::new();
        for entry in entries {
            table.insert(entry);
        }
        *self.table.write() = table;
    }
}

impl Default for Index {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> Entry {
        Entry::executable(name, format!("/usr/bin/{name}"))
    }

    #[test]
    fn add_assigns_monotonic_ids_from_one() {
        let index = Index::new();
        let a = index.add(entry("a"));
        let b = index.add(entry("b"));
        let c = index.add(entry("c"));
        assert_eq!(a, 1);
        assert!(b > a);
        assert!(c > b);
    }

    #[test]
    fn get_returns_stored_entry() {
        let index = Index::new();
        let id = index.add(entry("firefox"));
        let stored = index.get(id).expect("entry should exist");
        assert_eq!(stored.id, id);
        assert_eq!(stored.name, "firefox");
        assert_eq!(stored.exec, "/usr/bin/firefox");
        assert!(!stored.is_desktop);
    }

    #[test]
    fn get_unknown_id_returns_none() {
        let index = Index::new();
        assert!(index.get(42).is_none());
    }

    #[test]
    fn count_matches_snapshot_len() {
        let index = Index::new();
        for i in 0..5 {
            index.add(entry(&format!("app{i}")));
        }
        assert_eq!(index.count(), 5);
        assert_eq!(index.snapshot().len(), 5);
    }

    #[test]
    fn snapshot_entries_resolve_through_get() {
        let index = Index::new();
        index.add(entry("a"));
        index.add(entry("b"));
        for snap in index.snapshot() {
            let looked_up = index.get(snap.id).expect("snapshot id should resolve");
            assert_eq!(looked_up, snap);
        }
    }

    #[test]
    fn replace_all_swaps_table_and_resets_ids() {
        let index = Index::new();
        index.add(entry("old1"));
        index.add(entry("old2"));
        index.add(entry("old3"));

        index.replace_all(vec![entry("new1"), entry("new2")]);

        assert_eq!(index.count(), 2);
        let first = index.get(1).expect("fresh table starts at id 1");
        assert_eq!(first.name, "new1");
        assert!(index.get(3).is_none());
    }

    #[test]
    fn replace_all_with_empty_clears_index() {
        let index = Index::new();
        index.add(entry("a"));
        index.replace_all(Vec::new());
        assert_eq!(index.count(), 0);
        assert!(index.snapshot().is_empty());
    }

    #[test]
    fn display_name_prefers_exact_locale() {
        let mut e = entry("File Manager");
        e.localized_names
            .insert("ru".to_string(), "Файловый менеджер".to_string());
        e.localized_names
            .insert("en_GB".to_string(), "File Manager (GB)".to_string());
        assert_eq!(e.display_name("ru"), "Файловый менеджер");
        assert_eq!(e.display_name("en_GB"), "File Manager (GB)");
    }

    #[test]
    fn display_name_falls_back_to_language_part() {
        let mut e = entry("File Manager");
        e.localized_names
            .insert("ru".to_string(), "Файловый менеджер".to_string());
        assert_eq!(e.display_name("ru_RU"), "Файловый менеджер");
        assert_eq!(e.display_name("ru-RU"), "Файловый менеджер");
    }

    #[test]
    fn display_name_defaults_to_name() {
        let e = entry("gimp");
        assert_eq!(e.display_name("de"), "gimp");
        assert_eq!(e.display_name(""), "gimp");
    }
}
