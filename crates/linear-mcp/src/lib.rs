//! MCP (Model Context Protocol) server for Linear.
//!
//! This crate exposes the operations of a [`linear_core::LinearService`] as
//! MCP tools over newline-delimited stdio or a WebSocket endpoint.

pub mod error;
pub mod handlers;
pub mod protocol;
pub mod schema;
pub mod server;
pub mod tools;
pub mod transport;
pub mod websocket;

pub use error::{FrameError, ToolError, TransportError};
pub use handlers::{ToolRegistry, ToolSpec};
pub use server::McpServer;
pub use transport::{ConnectionId, Inbound, StdioTransport, Transport};
pub use websocket::WebSocketTransport;
