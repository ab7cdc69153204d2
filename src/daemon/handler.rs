//! Command dispatcher
//!
//! Per-connection command interpreter: mutates session state, evaluates
//! filters against the index snapshot, triggers re-indexing, and spawns
//! entries on behalf of the client. All handler failures become error
//! frames; only I/O errors on the connection propagate to the caller.

use std::sync::Arc;

use tokio::io::AsyncWrite;
use tracing::{debug, warn};

use crate::config::{expand_tilde, Config};
use crate::index::{Entry, Index};
use crate::runindex::RunIndex;
use crate::scanner::Indexer;

use super::protocol::{Command, ErrorKind, ResponseWriter, Value};
use super::session::{FilterExpr, FilterOp, Session};

/// Dispatches commands for a single connection.
pub struct ConnectionHandler {
    index: Arc<Index>,
    indexer: Arc<Indexer>,
    config: Arc<Config>,
    run_index: Option<Arc<RunIndex>>,
    session: Session,
}

impl ConnectionHandler {
    pub fn new(
        index: Arc<Index>,
        indexer: Arc<Indexer>,
        config: Arc<Config>,
        run_index: Option<Arc<RunIndex>>,
    ) -> Self {
        Self {
            index,
            indexer,
            config,
            run_index,
            session: Session::new(),
        }
    }

    /// Execute one command and write its response. Returns an error only
    /// when writing to the connection fails.
    pub async fn execute<W: AsyncWrite + Unpin>(
        &mut self,
        writer: &mut ResponseWriter<W>,
        cmd: Command,
    ) -> std::io::Result<()> {
        debug!(cmd = %cmd.name, args = cmd.args.len(), "executing command");

        match cmd.name.as_str() {
            "+filter-name" | "filter-name" => {
                self.handle_add_filter(writer, "+filter-name", &cmd.args, FilterDimension::Name)
                    .await
            }
            "+filter-cat" => {
                self.handle_add_filter(writer, "+filter-cat", &cmd.args, FilterDimension::Category)
                    .await
            }
            "+filter-path" => {
                self.handle_add_filter(writer, "+filter-path", &cmd.args, FilterDimension::Path)
                    .await
            }
            "0filters" => self.handle_reset_filters(writer).await,
            "list" => self.handle_list(writer).await,
            "list-next" => self.handle_list_next(writer, &cmd.args).await,
            "run" => self.handle_run(writer, &cmd.args).await,
            "lang" => self.handle_lang(writer, &cmd.args).await,
            "reindex" => self.handle_reindex(writer, &cmd.args).await,
            _ => {
                writer
                    .write_error(&cmd.name, ErrorKind::UnknownCommand, "Command not recognized")
                    .await
            }
        }
    }

    async fn handle_add_filter<W: AsyncWrite + Unpin>(
        &mut self,
        writer: &mut ResponseWriter<W>,
        verb: &str,
        args: &[Value],
        dimension: FilterDimension,
    ) -> std::io::Result<()> {
        if let Some(expr) = FilterExpr::from_args(args, dimension.default_op()) {
            debug!(?expr, "adding {verb} expression");
            match dimension {
                FilterDimension::Name => self.session.name_filters.push(expr),
                FilterDimension::Category => self.session.cat_filters.push(expr),
                FilterDimension::Path => self.session.path_filters.push(expr),
            }
        }
        writer
            .write_attrs(&[("cmd", verb.to_string()), ("status", "0".to_string())])
            .await
    }

    async fn handle_reset_filters<W: AsyncWrite + Unpin>(
        &mut self,
        writer: &mut ResponseWriter<W>,
    ) -> std::io::Result<()> {
        self.session.clear_filters();
        writer
            .write_attrs(&[("cmd", "0filters".to_string()), ("status", "0".to_string())])
            .await
    }

    /// Matching entries from the current snapshot, ordered by ID so that
    /// pagination offsets stay stable between calls.
    fn filtered_rows(&self) -> Vec<Arc<Entry>> {
        let mut rows = self.session.filter(self.index.snapshot());
        rows.sort_by_key(|entry| entry.id);
        rows
    }

    fn render_rows(&self, rows: &[Arc<Entry>]) -> String {
        let mut body = String::new();
        for entry in rows {
            body.push_str(&format!(
                "{} {}\n",
                entry.id,
                entry.display_name(&self.session.language)
            ));
        }
        body
    }

    async fn handle_list<W: AsyncWrite + Unpin>(
        &mut self,
        writer: &mut ResponseWriter<W>,
    ) -> std::io::Result<()> {
        let rows = self.filtered_rows();
        debug!(matched = rows.len(), total = self.index.count(), "list");

        let attrs = [
            ("cmd", "list".to_string()),
            ("status", "0".to_string()),
            ("list-len", rows.len().to_string()),
            ("pages", "1".to_string()),
        ];
        let body = self.render_rows(&rows);
        writer.write_with_body(&attrs, &body).await
    }

    async fn handle_list_next<W: AsyncWrite + Unpin>(
        &mut self,
        writer: &mut ResponseWriter<W>,
        args: &[Value],
    ) -> std::io::Result<()> {
        let Some(Value::Int(offset)) = args.first() else {
            return writer
                .write_error(
                    "list-next",
                    ErrorKind::InvalidArgument,
                    "list-next requires an integer offset",
                )
                .await;
        };
        let limit = match args.get(1) {
            Some(Value::Int(limit)) => *limit,
            None => self.config.daemon.list_limit as i64,
            Some(_) => {
                return writer
                    .write_error(
                        "list-next",
                        ErrorKind::InvalidArgument,
                        "limit must be an integer",
                    )
                    .await;
            }
        };
        if *offset < 0 || limit <= 0 {
            return writer
                .write_error(
                    "list-next",
                    ErrorKind::InvalidArgument,
                    "offset must be >= 0 and limit positive",
                )
                .await;
        }
        let offset = *offset as usize;
        let limit = limit as usize;

        let rows = self.filtered_rows();
        let end = rows.len().min(offset.saturating_add(limit));
        let page: &[Arc<Entry>] = if offset < rows.len() {
            &rows[offset..end]
        } else {
            &[]
        };

        let mut attrs = vec![
            ("cmd", "list-next".to_string()),
            ("status", "0".to_string()),
            ("list-len", page.len().to_string()),
            ("offset", offset.to_string()),
            ("limited", limit.to_string()),
        ];
        if offset.saturating_add(limit) < rows.len() {
            attrs.push(("list-next", format!("{} {}", offset + limit, limit)));
        }
        let body = self.render_rows(page);
        writer.write_with_body(&attrs, &body).await
    }

    async fn handle_run<W: AsyncWrite + Unpin>(
        &mut self,
        writer: &mut ResponseWriter<W>,
        args: &[Value],
    ) -> std::io::Result<()> {
        let Some(Value::Int(id)) = args.first() else {
            return writer
                .write_error(
                    "run",
                    ErrorKind::MissingId,
                    "run command requires an id parameter",
                )
                .await;
        };

        let Some(entry) = u64::try_from(*id).ok().and_then(|id| self.index.get(id)) else {
            return writer
                .write_error(
                    "run",
                    ErrorKind::IndexNotFound,
                    "Can't run application, requested index not found.",
                )
                .await;
        };

        debug!(idx = entry.id, exec = %entry.exec, terminal = entry.terminal, "spawning entry");
        let mut command = if entry.terminal {
            let term = self.config.daemon.terminal_command();
            let mut command = std::process::Command::new(term);
            command.arg("-e").arg(&entry.exec);
            command
        } else {
            let mut parts = entry.exec.split_whitespace();
            let Some(program) = parts.next() else {
                return writer
                    .write_error("run", ErrorKind::InvalidExec, "Empty exec command")
                    .await;
            };
            let mut command = std::process::Command::new(program);
            command.args(parts);
            command
        };

        // The child is detached; the OS reaps it once the daemon exits.
        match command.spawn() {
            Ok(child) => {
                let pid = child.id();
                debug!(pid, "entry spawned");
                if let Some(run_index) = &self.run_index {
                    if let Err(e) = run_index.increment(&entry.path.to_string_lossy()) {
                        warn!("failed to bump run counter: {e:#}");
                    }
                }
                writer
                    .write_attrs(&[
                        ("cmd", "run".to_string()),
                        ("idx", entry.id.to_string()),
                        ("status", "0".to_string()),
                        ("pid", pid.to_string()),
                    ])
                    .await
            }
            Err(e) => {
                warn!("failed to spawn {}: {e}", entry.exec);
                writer
                    .write_error("run", ErrorKind::ExecutionFailed, &e.to_string())
                    .await
            }
        }
    }

    async fn handle_lang<W: AsyncWrite + Unpin>(
        &mut self,
        writer: &mut ResponseWriter<W>,
        args: &[Value],
    ) -> std::io::Result<()> {
        let Some(Value::Str(lang)) = args.first() else {
            return writer
                .write_error(
                    "lang",
                    ErrorKind::InvalidArgument,
                    "lang command requires a string parameter",
                )
                .await;
        };
        self.session.language = lang.clone();
        writer
            .write_attrs(&[
                ("cmd", "lang".to_string()),
                ("status", "0".to_string()),
                ("lang", lang.clone()),
            ])
            .await
    }

    async fn handle_reindex<W: AsyncWrite + Unpin>(
        &mut self,
        writer: &mut ResponseWriter<W>,
        args: &[Value],
    ) -> std::io::Result<()> {
        let mut roots = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Value::Str(path) => roots.push(expand_tilde(path)),
                _ => {
                    return writer
                        .write_error(
                            "reindex",
                            ErrorKind::InvalidArgument,
                            "reindex arguments must be string paths",
                        )
                        .await;
                }
            }
        }

        let roots = if roots.is_empty() { None } else { Some(roots) };
        let indexed = self.indexer.reindex(roots).await;
        writer
            .write_attrs(&[
                ("cmd", "reindex".to_string()),
                ("status", "0".to_string()),
                ("indexed", indexed.to_string()),
            ])
            .await
    }
}

#[derive(Debug, Clone, Copy)]
enum FilterDimension {
    Name,
    Category,
    Path,
}

impl FilterDimension {
    fn default_op(&self) -> FilterOp {
        match self {
            Self::Name => FilterOp::Or,
            Self::Category => FilterOp::And,
            Self::Path => FilterOp::Or,
        }
    }
}
