//! Daemon configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Socket path override (defaults to `/tmp/ade-<uid>/indexd`)
    pub socket_path: Option<PathBuf>,
    /// Terminal emulator used for `Terminal=true` entries
    pub terminal: Option<String>,
    /// Default page size for `list-next`
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

fn default_list_limit() -> usize {
    128
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            terminal: None,
            list_limit: default_list_limit(),
        }
    }
}

impl DaemonConfig {
    /// Resolve the socket path: the configured override if set, otherwise
    /// `/tmp/ade-<uid>/indexd`.
    pub fn resolve_socket_path(&self) -> PathBuf {
        if let Some(path) = &self.socket_path {
            return path.clone();
        }
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/tmp/ade-{uid}/indexd"))
    }

    /// Terminal emulator command: the configured override, then `$TERM`,
    /// then `xterm`.
    pub fn terminal_command(&self) -> String {
        if let Some(term) = &self.terminal {
            return term.clone();
        }
        match std::env::var("TERM") {
            Ok(term) if !term.is_empty() => term,
            _ => "xterm".to_string(),
        }
    }
}
