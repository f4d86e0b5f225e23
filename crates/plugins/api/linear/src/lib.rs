//! Linear backend for linear-mcp.
//!
//! This crate talks to the Linear GraphQL API and maps its responses onto the
//! records defined in `linear-core`.

mod client;
mod queries;
mod types;

pub use client::LinearClient;

/// Default Linear GraphQL endpoint.
pub const DEFAULT_LINEAR_URL: &str = linear_core::config::DEFAULT_API_URL;
