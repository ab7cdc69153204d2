//! Scanner configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directories scanned for executables (defaults to `PATH` plus the
    /// rc file entries)
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    /// Directories scanned recursively for desktop entries
    #[serde(default = "default_desktop_paths")]
    pub desktop_paths: Vec<PathBuf>,
    /// Executable scanner parallelism
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    4
}

/// The standard application directories.
pub fn default_desktop_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("/usr/share/applications"),
        PathBuf::from("/usr/local/share/applications"),
    ];
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(".local/share/applications"));
    }
    paths
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            desktop_paths: default_desktop_paths(),
            workers: default_workers(),
        }
    }
}
