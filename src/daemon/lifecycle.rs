//! Daemon lifecycle
//!
//! Wires the index, scanner pipeline, and server together; handles startup,
//! signals, and graceful shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::Config;
use crate::index::Index;
use crate::runindex::RunIndex;
use crate::scanner::Indexer;

use super::server::CmdlistServer;

/// Daemon instance managing all components
pub struct Daemon {
    config: Arc<Config>,
    index: Arc<Index>,
    indexer: Arc<Indexer>,
    run_index: Option<Arc<RunIndex>>,
    socket_path: PathBuf,
    shutdown_tx: broadcast::Sender<()>,
}

impl Daemon {
    /// Start the daemon: build the initial index and prepare the server.
    /// Fails on configuration or socket path problems; the caller exits
    /// non-zero.
    pub async fn start(config: Config) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let index = Arc::new(Index::new());
        let indexer = Arc::new(Indexer::new(index.clone(), config.scan.clone()));

        info!("building initial index");
        let count = indexer.reindex(None).await;
        info!(entries = count, "initial index ready");

        let run_index = match RunIndex::open() {
            Ok(run_index) => Some(Arc::new(run_index)),
            Err(e) => {
                warn!("run-frequency store unavailable: {e:#}");
                None
            }
        };

        let socket_path = config.daemon.resolve_socket_path();
        let (shutdown_tx, _) = broadcast::channel(16);

        Ok(Self {
            config,
            index,
            indexer,
            run_index,
            socket_path,
            shutdown_tx,
        })
    }

    /// Run the daemon until SIGINT or SIGTERM.
    pub async fn run(&self) -> Result<()> {
        let server = CmdlistServer::new(
            self.socket_path.clone(),
            self.index.clone(),
            self.indexer.clone(),
            self.config.clone(),
            self.run_index.clone(),
        );
        let shutdown_rx = self.shutdown_tx.subscribe();
        let server_handle = tokio::spawn(async move {
            match server.run(shutdown_rx).await {
                Ok(()) => info!("server shut down cleanly"),
                Err(e) => warn!("server failed: {e:#}"),
            }
        });

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("received SIGINT, shutting down");
            }
            _ = Self::wait_for_sigterm() => {
                info!("received SIGTERM, shutting down");
            }
        }

        // Stop any in-flight scan, then let handlers finish their current
        // command.
        self.indexer.stop();
        let _ = self.shutdown_tx.send(());

        let abort = server_handle.abort_handle();
        if tokio::time::timeout(Duration::from_secs(5), server_handle)
            .await
            .is_err()
        {
            warn!("server did not shut down within 5s, aborting");
            abort.abort();
        }

        info!("daemon stopped");
        Ok(())
    }

    pub fn index(&self) -> Arc<Index> {
        self.index.clone()
    }

    #[cfg(unix)]
    async fn wait_for_sigterm() {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to register SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(not(unix))]
    async fn wait_for_sigterm() {
        std::future::pending::<()>().await
    }
}
