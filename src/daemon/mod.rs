//! Daemon components
//!
//! The CMDLIST protocol codec, the Unix socket server, the per-connection
//! dispatcher with its session state, and the daemon lifecycle.

pub mod handler;
pub mod lifecycle;
pub mod protocol;
pub mod server;
pub mod session;

pub use lifecycle::Daemon;
pub use server::CmdlistServer;
