//! `list` subcommand: query the daemon and print matching applications

use anyhow::Result;

use crate::client::DaemonClient;
use crate::config::Config;

pub async fn list(
    config: &Config,
    query: Vec<String>,
    category: Option<String>,
    lang: Option<String>,
) -> Result<()> {
    let socket_path = config.daemon.resolve_socket_path();
    let mut client = DaemonClient::connect_to(&socket_path).await?;

    if let Some(lang) = lang {
        client.set_language(&lang).await?;
    }
    if !query.is_empty() {
        client.add_name_filter(&query).await?;
    }
    if let Some(category) = category {
        client.add_category_filter(&[category]).await?;
    }

    let apps = client.list().await?;
    for app in &apps {
        println!("{} {}", app.id, app.name);
    }
    Ok(())
}
