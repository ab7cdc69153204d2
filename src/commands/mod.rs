//! CLI subcommands
//!
//! One module per subcommand. `daemon` runs the index daemon itself; the
//! rest are thin clients over the CMDLIST protocol.

pub mod daemon;
pub mod list;
pub mod reindex;
pub mod run;
