//! CMDLIST server
//!
//! Unix domain socket accept loop. Each accepted connection runs on its own
//! task with its own session; a panicking handler task takes down only that
//! connection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::{unix::OwnedWriteHalf, UnixListener, UnixStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::index::Index;
use crate::runindex::RunIndex;
use crate::scanner::Indexer;

use super::handler::ConnectionHandler;
use super::protocol::{CommandReader, ErrorKind, ProtocolError, ResponseWriter};

/// CMDLIST server listening on a Unix domain socket
pub struct CmdlistServer {
    socket_path: PathBuf,
    index: Arc<Index>,
    indexer: Arc<Indexer>,
    config: Arc<Config>,
    run_index: Option<Arc<RunIndex>>,
}

impl CmdlistServer {
    pub fn new(
        socket_path: PathBuf,
        index: Arc<Index>,
        indexer: Arc<Indexer>,
        config: Arc<Config>,
        run_index: Option<Arc<RunIndex>>,
    ) -> Self {
        Self {
            socket_path,
            index,
            indexer,
            config,
            run_index,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Run the accept loop until the shutdown signal fires.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o755))?;
            }
        }

        // Unlink any stale socket from a previous run before binding.
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)
                .context("failed to remove existing socket file")?;
        }

        let listener =
            UnixListener::bind(&self.socket_path).context("failed to bind to Unix socket")?;
        info!("listening on {}", self.socket_path.display());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, _addr)) => {
                            debug!("new client connection");
                            let handler = ConnectionHandler::new(
                                self.index.clone(),
                                self.indexer.clone(),
                                self.config.clone(),
                                self.run_index.clone(),
                            );
                            tokio::spawn(handle_connection(stream, handler));
                        }
                        Err(e) => {
                            error!("accept error: {e}");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("server shutting down");
                    break;
                }
            }
        }

        // Best-effort cleanup.
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }

        Ok(())
    }
}

/// Handle a single client connection: read commands in arrival order and
/// fully write each response before reading the next.
async fn handle_connection(stream: UnixStream, mut handler: ConnectionHandler) {
    let (read_half, write_half) = stream.into_split();
    let mut writer: ResponseWriter<OwnedWriteHalf> = ResponseWriter::new(write_half);

    let mut reader = match CommandReader::new(read_half).await {
        Ok(reader) => reader,
        Err(e) => {
            warn!("connection rejected: {e}");
            let _ = writer
                .write_error("parser", ErrorKind::InvalidHeader, &e.to_string())
                .await;
            return;
        }
    };

    loop {
        match reader.next_command().await {
            Ok(Some(cmd)) => {
                if let Err(e) = handler.execute(&mut writer, cmd).await {
                    debug!("connection write failed: {e}");
                    break;
                }
            }
            Ok(None) => {
                debug!("client disconnected");
                break;
            }
            Err(ProtocolError::Parse(token)) => {
                debug!("parse error on connection: {token}");
                let desc = format!("cannot parse value: {token}");
                if writer
                    .write_error("parser", ErrorKind::ParseError, &desc)
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(e) => {
                debug!("connection error: {e}");
                break;
            }
        }
    }
}
