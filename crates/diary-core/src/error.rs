//! Error types for diary-core

use thiserror::Error;

/// Result type alias using diary-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in diary-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// No signed-in identity
    #[error("User is not logged in")]
    Unauthenticated,

    /// Diary not found for the current owner
    #[error("Diary not found: {0}")]
    NotFound(String),

    /// The client was closed
    #[error("Diary client is closed")]
    Closed,

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote image storage error
    #[error("Storage error: {0}")]
    Storage(String),
}
