//! Error types for tool dispatch and transports.

use thiserror::Error;

use crate::protocol::JsonRpcError;
use crate::schema::Violation;
use crate::transport::ConnectionId;

/// How many violations a rejection message lists.
const MAX_REPORTED_VIOLATIONS: usize = 3;

/// Failure of a single tool call. The `Display` text is what the client sees
/// after `Error: ` in the result envelope.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The call carried no `arguments` member
    #[error("No arguments provided")]
    NoArguments,

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments did not match the tool's input shape
    #[error("Invalid arguments for {tool}: {}", summarize(.violations))]
    InvalidArguments {
        tool: String,
        violations: Vec<Violation>,
    },

    #[error("Tool {tool} timed out after {after_secs}s")]
    Timeout { tool: String, after_secs: u64 },

    /// The backend rejected or failed the operation
    #[error("{0}")]
    Backend(#[from] linear_core::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn summarize(violations: &[Violation]) -> String {
    let shown = violations
        .iter()
        .take(MAX_REPORTED_VIOLATIONS)
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ");

    match violations.len().saturating_sub(MAX_REPORTED_VIOLATIONS) {
        0 => shown,
        rest => format!("{} (and {} more)", shown, rest),
    }
}

/// Failure to move messages across a transport.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An inbound frame could not be read as JSON-RPC 2.0
    #[error("Malformed message: {reason}")]
    Malformed {
        origin: Option<ConnectionId>,
        reason: FrameError,
    },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why an inbound frame was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Not UTF-8 or not JSON
    #[error("{0}")]
    Parse(String),

    /// Valid JSON that is not a JSON-RPC 2.0 message
    #[error("{0}")]
    InvalidRequest(String),
}

impl FrameError {
    /// JSON-RPC error answering the frame: -32700 or -32600.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        match self {
            FrameError::Parse(detail) => JsonRpcError::parse_error(detail),
            FrameError::InvalidRequest(detail) => JsonRpcError::invalid_request(detail),
        }
    }
}
