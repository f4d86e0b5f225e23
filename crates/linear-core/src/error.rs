//! Error types for linear-mcp.

use thiserror::Error;

/// Main error type for backend operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication failed
    #[error("Authentication error: {0}")]
    Auth(String),

    /// API returned an error status
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// GraphQL response carried an `errors` array
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response could not be mapped or a mutation reported failure
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Map an HTTP status code and body to an error.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => Error::Auth(message),
            404 => Error::NotFound(message),
            _ => Error::Api { status, message },
        }
    }
}

/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, Error>;
