//! `start` subcommand: run the index daemon

use anyhow::Result;

use crate::config::Config;
use crate::daemon::Daemon;

pub async fn start(config: Config) -> Result<()> {
    let daemon = Daemon::start(config).await?;
    daemon.run().await
}
