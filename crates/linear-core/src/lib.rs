//! Core traits, types, and error handling for linear-mcp.
//!
//! This crate provides the foundational abstractions shared by the protocol
//! server and the Linear API client: the [`LinearService`] boundary, the typed
//! argument records it accepts and the result records it returns.

pub mod args;
pub mod config;
pub mod error;
pub mod service;
pub mod types;

pub use args::*;
pub use error::{Error, Result};
pub use service::LinearService;
#[cfg(feature = "mock")]
pub use service::MockLinearService;
pub use types::*;
