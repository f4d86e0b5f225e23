//! Transport layer for MCP JSON-RPC communication.
//!
//! A transport yields inbound messages tagged with the connection they came
//! from and delivers responses back. The stdio transport speaks
//! newline-delimited JSON on stdin/stdout; see [`crate::websocket`] for the
//! WebSocket endpoint.

use std::fmt;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{FrameError, TransportError};
use crate::protocol::{IncomingMessage, JsonRpcResponse};

/// Identifies one client connection on a multi-client transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A parsed message and the connection it arrived on.
#[derive(Debug, Clone)]
pub struct Inbound {
    /// `None` on single-stream transports
    pub origin: Option<ConnectionId>,
    pub message: IncomingMessage,
}

/// Bidirectional message channel the server runs on.
///
/// `recv` must be cancel-safe: the server polls it alongside in-flight
/// requests and drops the future when a request finishes first.
#[async_trait]
pub trait Transport: Send {
    /// Next inbound message, or `Ok(None)` once the peer is gone.
    ///
    /// A frame that is not valid JSON-RPC 2.0 surfaces as
    /// [`TransportError::Malformed`]; the transport stays usable after it.
    async fn recv(&mut self) -> Result<Option<Inbound>, TransportError>;

    /// Deliver a response. `target` is the connection the request came from.
    async fn send(
        &mut self,
        response: &JsonRpcResponse,
        target: Option<ConnectionId>,
    ) -> Result<(), TransportError>;
}

type Reader = Box<dyn AsyncBufRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Newline-delimited JSON over a byte stream.
pub struct StdioTransport {
    reader: Reader,
    /// Bytes of the line being read; survives a cancelled `recv`
    pending: Vec<u8>,
    writer: Writer,
}

impl StdioTransport {
    /// Create a transport using stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )
    }

    /// Create a transport over any reader/writer pair.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            pending: Vec::new(),
            writer: Box::new(writer),
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn recv(&mut self) -> Result<Option<Inbound>, TransportError> {
        loop {
            let read = self.reader.read_until(b'\n', &mut self.pending).await?;
            if read == 0 && self.pending.is_empty() {
                return Ok(None);
            }

            let raw = std::mem::take(&mut self.pending);
            let line = match String::from_utf8(raw) {
                Ok(line) => line,
                Err(e) => {
                    return Err(TransportError::Malformed {
                        origin: None,
                        reason: FrameError::Parse(format!("line is not UTF-8: {}", e.utf8_error())),
                    })
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            tracing::debug!("Received: {}", line);

            return match IncomingMessage::parse(line) {
                Ok(message) => Ok(Some(Inbound {
                    origin: None,
                    message,
                })),
                Err(reason) => Err(TransportError::Malformed {
                    origin: None,
                    reason,
                }),
            };
        }
    }

    async fn send(
        &mut self,
        response: &JsonRpcResponse,
        _target: Option<ConnectionId>,
    ) -> Result<(), TransportError> {
        let mut json = serde_json::to_string(response)?;
        tracing::debug!("Sending: {}", json);

        json.push('\n');
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
