//! ade-indexd: per-user application index daemon
//!
//! Indexes launchable desktop applications and POSIX executables and serves
//! them to launcher clients over a local Unix socket using the CMDLIST
//! protocol. The same binary doubles as a small client for the daemon.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use ade_indexd::commands;
use ade_indexd::config::Config;

#[derive(Parser)]
#[command(name = "ade-indexd")]
#[command(about = "Per-user application index daemon speaking the CMDLIST protocol")]
#[command(version)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the index daemon
    Start,

    /// List indexed applications matching the given name terms
    List {
        /// Name filter terms (substring match)
        query: Vec<String>,

        /// Category filter
        #[arg(short, long)]
        category: Option<String>,

        /// Preferred language for display names
        #[arg(short, long)]
        lang: Option<String>,
    },

    /// Run an application by its index ID
    Run {
        /// Entry ID as reported by `list`
        id: u64,
    },

    /// Trigger a re-index, optionally restricted to the given roots
    Reindex {
        /// Directories to scan instead of the configured paths
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let log_level = match cli.verbose {
        0 => config.logging.level.as_tracing_level(),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Start => commands::daemon::start(config).await,
        Commands::List {
            query,
            category,
            lang,
        } => commands::list::list(&config, query, category, lang).await,
        Commands::Run { id } => commands::run::run(&config, id).await,
        Commands::Reindex { paths } => commands::reindex::reindex(&config, paths).await,
    }
}
