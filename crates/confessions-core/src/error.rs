//! Error types for confessions-core

use thiserror::Error;

/// Result type alias using confessions-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in confessions-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// HTTP transport error talking to the hosted store
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Hosted store rejected the request
    #[error("Remote API error: {0}")]
    Api(String),

    /// A uniqueness constraint rejected the write (e.g. a duplicate like)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Confession not found
    #[error("Confession not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error came from a write the caller may retry right away.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Api(_) | Self::Conflict(_) | Self::LibSql(_) | Self::Database(_)
        )
    }
}
