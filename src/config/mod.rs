//! Configuration for ade-indexd
//!
//! Config is an explicit value threaded into the daemon and indexer; there
//! is no process-wide singleton. Sources are the process environment and the
//! rc file `~/.config/ade/indexd.rc` (one scan path per line).

mod daemon;
mod logging;
mod scan;

pub use daemon::DaemonConfig;
pub use logging::{LogLevel, LoggingConfig};
pub use scan::ScanConfig;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Per-line scan paths are read from this rc file, relative to `$HOME`.
pub const RC_FILE: &str = ".config/ade/indexd.rc";

/// Main configuration for the daemon and its clients
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Scanner configuration
    #[serde(default)]
    pub scan: ScanConfig,
    /// Daemon configuration
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Build configuration from the process environment and the rc file.
    ///
    /// Scan roots are seeded from colon-separated `PATH` plus any paths
    /// listed in the rc file. `ADE_INDEXD_SOCK`, `ADE_DEFAULT_TERM`,
    /// `ADE_INDEXD_WORKERS` and `ADE_INDEXD_LIST_LIMIT` override the
    /// corresponding defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(path_var) = std::env::var("PATH") {
            config.scan.paths = split_path_var(&path_var);
        }
        if let Some(home) = home_dir() {
            let rc_path = home.join(RC_FILE);
            match load_rc_paths(&rc_path) {
                Ok(extra) => config.scan.paths.extend(extra),
                Err(e) => tracing::warn!("ignoring rc file {}: {e:#}", rc_path.display()),
            }
        }

        if let Ok(workers) = std::env::var("ADE_INDEXD_WORKERS") {
            config.scan.workers = workers
                .parse()
                .context("ADE_INDEXD_WORKERS must be a positive integer")?;
        }
        if let Ok(limit) = std::env::var("ADE_INDEXD_LIST_LIMIT") {
            config.daemon.list_limit = limit
                .parse()
                .context("ADE_INDEXD_LIST_LIMIT must be a positive integer")?;
        }
        if let Ok(sock) = std::env::var("ADE_INDEXD_SOCK") {
            config.daemon.socket_path = Some(expand_tilde(&sock));
        }
        if let Ok(term) = std::env::var("ADE_DEFAULT_TERM") {
            if !term.is_empty() {
                config.daemon.terminal = Some(term);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields, collecting every error so the
    /// user can fix them in one pass.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.scan.workers == 0 {
            errors.push("workers must be positive".to_string());
        }
        if self.daemon.list_limit == 0 {
            errors.push("list_limit must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

/// Split a colon-separated `PATH`-style value, dropping empty segments.
pub fn split_path_var(value: &str) -> Vec<PathBuf> {
    value
        .split(':')
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Read additional scan paths from an rc file: one path per line, `#`
/// starts a comment, leading `~` is expanded. A missing file yields an
/// empty list.
pub fn load_rc_paths(path: &Path) -> Result<Vec<PathBuf>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).context("failed to read rc file"),
    };

    let paths = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(expand_tilde)
        .collect();
    Ok(paths)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(path)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}
