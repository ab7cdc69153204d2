//! Client module
//!
//! CMDLIST client used by the CLI subcommands to talk to a running daemon.

pub mod connection;

pub use connection::{format_argument, Application, DaemonClient, Response};

use thiserror::Error;

/// Errors that can occur when communicating with the daemon
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon is not running. Start it with: ade-indexd start")]
    DaemonNotRunning,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("server error: {kind}: {desc}")]
    Server { kind: String, desc: String },
}
