//! Common error types for taxsync

use thiserror::Error;

/// Common result type for taxsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the taxsync crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote source unreachable or request failed
    #[error("Network error: {0}")]
    Network(String),

    /// Remote source rejected our credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Malformed remote response
    #[error("Parse error: {0}")]
    Parse(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
