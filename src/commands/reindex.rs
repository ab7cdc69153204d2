//! `reindex` subcommand: rebuild the daemon's index

use anyhow::Result;

use crate::client::DaemonClient;
use crate::config::Config;

pub async fn reindex(config: &Config, paths: Vec<String>) -> Result<()> {
    let socket_path = config.daemon.resolve_socket_path();
    let mut client = DaemonClient::connect_to(&socket_path).await?;
    let indexed = client.reindex(&paths).await?;
    println!("indexed {indexed} entries");
    Ok(())
}
