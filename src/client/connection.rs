//! Client connection
//!
//! Unix socket connection speaking CMDLIST text v01. The client sends the
//! `TXT01` header once at connect time and expects the same header echoed
//! in front of every response frame.

use std::collections::HashMap;
use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{
    unix::{OwnedReadHalf, OwnedWriteHalf},
    UnixStream,
};
use tracing::debug;

use crate::daemon::protocol::PROTOCOL_HEADER;

use super::ClientError;

/// An application row from a `list` response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub id: u64,
    pub name: String,
}

/// A parsed response frame
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub attrs: HashMap<String, String>,
    pub body: String,
}

impl Response {
    /// Convert an error frame into a `ClientError`, passing success frames
    /// through.
    fn check(self) -> Result<Self, ClientError> {
        if let Some(kind) = self.attrs.get("error") {
            return Err(ClientError::Server {
                kind: kind.clone(),
                desc: self.attrs.get("desc").cloned().unwrap_or_default(),
            });
        }
        Ok(self)
    }

    fn attr(&self, key: &str) -> Result<&str, ClientError> {
        self.attrs
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ClientError::MalformedResponse(format!("missing attribute {key}")))
    }
}

/// Format an argument the way the wire expects: an explicit leading `"`
/// is kept, boolean and integer tokens pass through, anything else is
/// quoted as a string.
pub fn format_argument(arg: &str) -> String {
    let arg = arg.trim();
    if arg.starts_with('"') {
        return arg.to_string();
    }
    if matches!(arg, "t" | "f" | "or" | "and" | "not") {
        return arg.to_string();
    }
    if arg.parse::<i64>().is_ok() {
        return arg.to_string();
    }
    format!("\"{arg}")
}

/// Client connection to the daemon
pub struct DaemonClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl DaemonClient {
    /// Connect to the daemon at the given socket path and send the
    /// protocol header.
    pub async fn connect_to(socket_path: &Path) -> Result<Self, ClientError> {
        debug!("connecting to daemon at {}", socket_path.display());
        let stream = UnixStream::connect(socket_path).await.map_err(|e| {
            if matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused
            ) {
                ClientError::DaemonNotRunning
            } else {
                ClientError::ConnectionFailed(e.to_string())
            }
        })?;

        let (read_half, mut write_half) = stream.into_split();
        write_half
            .write_all(PROTOCOL_HEADER)
            .await
            .map_err(|e| ClientError::RequestFailed(format!("failed to send header: {e}")))?;

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// Send one command (arguments first, then the verb) and read its
    /// response frame.
    pub async fn request(
        &mut self,
        verb: &str,
        args: &[String],
        expect_body: bool,
    ) -> Result<Response, ClientError> {
        let mut request = String::new();
        for arg in args {
            request.push_str(&format_argument(arg));
            request.push('\n');
        }
        request.push_str(verb);
        request.push('\n');

        self.writer
            .write_all(request.as_bytes())
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;
        self.writer
            .flush()
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;

        self.read_response(expect_body).await
    }

    async fn read_response(&mut self, expect_body: bool) -> Result<Response, ClientError> {
        let mut header = [0u8; 5];
        self.reader
            .read_exact(&mut header)
            .await
            .map_err(|e| ClientError::RequestFailed(format!("failed to read header: {e}")))?;
        if &header != PROTOCOL_HEADER {
            return Err(ClientError::MalformedResponse(format!(
                "unexpected response header {:?}",
                String::from_utf8_lossy(&header)
            )));
        }

        let mut response = Response::default();
        loop {
            let line = self.read_line().await?;
            let line = line.trim_end_matches('\n');
            if line.is_empty() {
                break;
            }
            if let Some((key, value)) = line.split_once(':') {
                response
                    .attrs
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        // Error frames carry no body.
        if expect_body && !response.attrs.contains_key("error") {
            let marker = self.read_line().await?;
            if marker.trim_end_matches('\n') != "body:" {
                return Err(ClientError::MalformedResponse(format!(
                    "expected body marker, got {marker:?}"
                )));
            }
            loop {
                let line = self.read_line().await?;
                if line == "\n" || line.is_empty() {
                    break;
                }
                response.body.push_str(&line);
            }
        }

        Ok(response)
    }

    async fn read_line(&mut self) -> Result<String, ClientError> {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;
        Ok(line)
    }

    /// Append a name filter expression.
    pub async fn add_name_filter(&mut self, terms: &[String]) -> Result<(), ClientError> {
        self.request("+filter-name", terms, false).await?.check()?;
        Ok(())
    }

    /// Append a category filter expression.
    pub async fn add_category_filter(&mut self, categories: &[String]) -> Result<(), ClientError> {
        self.request("+filter-cat", categories, false)
            .await?
            .check()?;
        Ok(())
    }

    /// Empty all filters.
    pub async fn reset_filters(&mut self) -> Result<(), ClientError> {
        self.request("0filters", &[], false).await?.check()?;
        Ok(())
    }

    /// Set the session language.
    pub async fn set_language(&mut self, lang: &str) -> Result<(), ClientError> {
        self.request("lang", &[format!("\"{lang}")], false)
            .await?
            .check()?;
        Ok(())
    }

    /// List applications matching the session filters.
    pub async fn list(&mut self) -> Result<Vec<Application>, ClientError> {
        let response = self.request("list", &[], true).await?.check()?;
        Ok(parse_applications(&response.body))
    }

    /// Run an application by ID; returns the child PID.
    pub async fn run(&mut self, id: u64) -> Result<u32, ClientError> {
        let response = self
            .request("run", &[id.to_string()], false)
            .await?
            .check()?;
        response
            .attr("pid")?
            .parse()
            .map_err(|_| ClientError::MalformedResponse("pid is not a number".to_string()))
    }

    /// Trigger a re-index; returns the final entry count.
    pub async fn reindex(&mut self, paths: &[String]) -> Result<u64, ClientError> {
        let quoted: Vec<String> = paths.iter().map(|p| format!("\"{p}")).collect();
        let response = self.request("reindex", &quoted, false).await?.check()?;
        response
            .attr("indexed")?
            .parse()
            .map_err(|_| ClientError::MalformedResponse("indexed is not a number".to_string()))
    }
}

/// Parse `<id> <display name>` rows from a list body.
fn parse_applications(body: &str) -> Vec<Application> {
    body.lines()
        .filter_map(|line| {
            let line = line.trim();
            let (id, name) = line.split_once(' ')?;
            Some(Application {
                id: id.parse().ok()?,
                name: name.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_argument_keeps_explicit_strings() {
        assert_eq!(format_argument("\"opt: terminal"), "\"opt: terminal");
    }

    #[test]
    fn format_argument_passes_keywords_and_numbers() {
        for token in ["t", "f", "or", "and", "not", "42", "-3"] {
            assert_eq!(format_argument(token), token);
        }
    }

    #[test]
    fn format_argument_quotes_plain_text() {
        assert_eq!(format_argument("firefox"), "\"firefox");
        assert_eq!(format_argument("  spaced  "), "\"spaced");
    }

    #[test]
    fn parse_applications_reads_rows() {
        let apps = parse_applications("1 Firefox\n2 Firefox (Wayland)\n");
        assert_eq!(
            apps,
            vec![
                Application {
                    id: 1,
                    name: "Firefox".to_string()
                },
                Application {
                    id: 2,
                    name: "Firefox (Wayland)".to_string()
                },
            ]
        );
    }

    #[test]
    fn parse_applications_skips_garbage_rows() {
        let apps = parse_applications("nonsense\n3 Gimp\n\n");
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].id, 3);
    }

    #[test]
    fn error_frames_become_client_errors() {
        let mut response = Response::default();
        response
            .attrs
            .insert("error".to_string(), "index not found".to_string());
        response
            .attrs
            .insert("desc".to_string(), "no such entry".to_string());
        let err = response.check().unwrap_err();
        match err {
            ClientError::Server { kind, desc } => {
                assert_eq!(kind, "index not found");
                assert_eq!(desc, "no such entry");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
