//! CMDLIST protocol codec
//!
//! Frame-aware reader that turns the connection byte stream into typed
//! commands, and a writer that emits attribute blocks with optional bodies.
//!
//! A connection opens with the 5-byte header `TXT01`: the first three bytes
//! select the encoding family (`BIN` is reserved, unimplemented) and the
//! last two the version. After the header the stream is LF-terminated
//! lines. Value lines push onto a stack; a verb line commits the stack as
//! the command's arguments. Every response frame mirrors the header before
//! its attribute block.

use std::fmt;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Protocol header: text encoding family, version 01.
pub const PROTOCOL_HEADER: &[u8; 5] = b"TXT01";

/// Verbs recognized by the parser. `filter-name` is a legacy alias of
/// `+filter-name`; `saveconf` is reserved and has no handler.
const VERBS: &[&str] = &[
    "+filter-name",
    "+filter-cat",
    "+filter-path",
    "0filters",
    "list",
    "list-next",
    "run",
    "lang",
    "reindex",
    "saveconf",
    "filter-name",
];

/// Codec errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid header")]
    InvalidHeader,
    #[error("cannot parse value: {0}")]
    Parse(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Tag carried by a boolean-typed token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpTag {
    True,
    False,
    Or,
    And,
    Not,
}

/// A typed value on the parser stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(OpTag),
}

/// A parsed command: verb plus the stack contents in push order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<Value>,
}

/// Reads commands off one side of a connection.
pub struct CommandReader<R> {
    reader: BufReader<R>,
    line: String,
}

impl<R: AsyncRead + Unpin> CommandReader<R> {
    /// Consume and validate the 5-byte connection header.
    pub async fn new(inner: R) -> Result<Self, ProtocolError> {
        let mut reader = BufReader::new(inner);
        let mut header = [0u8; 5];
        reader
            .read_exact(&mut header)
            .await
            .map_err(|_| ProtocolError::InvalidHeader)?;
        if &header != PROTOCOL_HEADER {
            return Err(ProtocolError::InvalidHeader);
        }
        Ok(Self {
            reader,
            line: String::new(),
        })
    }

    /// Parse the next command. Returns `Ok(None)` on EOF; a partial stack
    /// at EOF is discarded. A parse error discards the current stack but
    /// leaves the reader usable for the next command.
    pub async fn next_command(&mut self) -> Result<Option<Command>, ProtocolError> {
        let mut stack: Vec<Value> = Vec::new();
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line).await? == 0 {
                return Ok(None);
            }
            let line = self.line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if VERBS.contains(&line) {
                return Ok(Some(Command {
                    name: line.to_string(),
                    args: stack,
                }));
            }
            stack.push(parse_value(line)?);
        }
    }
}

fn parse_value(line: &str) -> Result<Value, ProtocolError> {
    if let Some(rest) = line.strip_prefix('"') {
        return Ok(Value::Str(rest.to_string()));
    }
    match line {
        "t" => return Ok(Value::Bool(OpTag::True)),
        "f" => return Ok(Value::Bool(OpTag::False)),
        "or" => return Ok(Value::Bool(OpTag::Or)),
        "and" => return Ok(Value::Bool(OpTag::And)),
        "not" => return Ok(Value::Bool(OpTag::Not)),
        _ => {}
    }
    if let Ok(n) = line.parse::<i64>() {
        return Ok(Value::Int(n));
    }
    Err(ProtocolError::Parse(line.to_string()))
}

/// Error kinds surfaced on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidHeader,
    ParseError,
    UnknownCommand,
    MissingId,
    InvalidArgument,
    IndexNotFound,
    ExecutionFailed,
    InvalidExec,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidHeader => "invalid header",
            Self::ParseError => "parse error",
            Self::UnknownCommand => "unknown command",
            Self::MissingId => "missing id",
            Self::InvalidArgument => "invalid argument",
            Self::IndexNotFound => "index not found",
            Self::ExecutionFailed => "execution failed",
            Self::InvalidExec => "invalid exec",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes response frames to one side of a connection.
///
/// Frame shape: the `TXT01` header, `key: value` attribute lines, a blank
/// line, and optionally a `body:` block terminated by another blank line.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a response consisting of attributes only.
    pub async fn write_attrs(&mut self, attrs: &[(&str, String)]) -> std::io::Result<()> {
        let mut frame = String::new();
        push_attrs(&mut frame, attrs);
        self.write_frame(&frame).await
    }

    /// Write a response with an attribute block and a body block. Body rows
    /// must carry their own trailing newlines.
    pub async fn write_with_body(
        &mut self,
        attrs: &[(&str, String)],
        body: &str,
    ) -> std::io::Result<()> {
        let mut frame = String::new();
        push_attrs(&mut frame, attrs);
        frame.push_str("body:\n");
        frame.push_str(body);
        frame.push('\n');
        self.write_frame(&frame).await
    }

    /// Write an error frame. Not a connection-terminating condition.
    pub async fn write_error(
        &mut self,
        cmd: &str,
        kind: ErrorKind,
        desc: &str,
    ) -> std::io::Result<()> {
        self.write_attrs(&[
            ("error-cmd", cmd.to_string()),
            ("error", kind.to_string()),
            ("desc", desc.to_string()),
        ])
        .await
    }

    async fn write_frame(&mut self, payload: &str) -> std::io::Result<()> {
        self.writer.write_all(PROTOCOL_HEADER).await?;
        self.writer.write_all(payload.as_bytes()).await?;
        self.writer.flush().await
    }
}

fn push_attrs(frame: &mut String, attrs: &[(&str, String)]) {
    for (key, value) in attrs {
        frame.push_str(key);
        frame.push_str(": ");
        frame.push_str(value);
        frame.push('\n');
    }
    frame.push('\n');
}
