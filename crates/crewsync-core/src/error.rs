//! Error types for crewsync-core

use thiserror::Error;

/// Result type alias using crewsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in crewsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A worker tried to clock in while a shift is still open
    #[error("Worker {0} already has an open shift")]
    ShiftAlreadyOpen(String),
}
