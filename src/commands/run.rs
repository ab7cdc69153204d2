//! `run` subcommand: launch an application by index ID

use anyhow::Result;

use crate::client::DaemonClient;
use crate::config::Config;

pub async fn run(config: &Config, id: u64) -> Result<()> {
    let socket_path = config.daemon.resolve_socket_path();
    let mut client = DaemonClient::connect_to(&socket_path).await?;
    let pid = client.run(id).await?;
    println!("started (pid {pid})");
    Ok(())
}
