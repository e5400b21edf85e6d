use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] diary_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Diary ID cannot be empty")]
    EmptyDiaryId,
    #[error("Diary not found for id/prefix: {0}")]
    DiaryNotFound(String),
    #[error("{0}")]
    AmbiguousDiaryId(String),
    #[error("Invalid date '{0}': expected RFC 3339, e.g. 2024-01-02T08:30:00+02:00")]
    InvalidDate(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Managed sync error: {0}")]
    ManagedSync(String),
    #[error(
        "Sync is not configured. Run `diary config init --sync-token-endpoint <url>` + `diary auth login`."
    )]
    SyncNotConfigured,
    #[error(
        "The media API is not configured. Run `diary config init --media-api-base-url <url>` + `diary auth login`."
    )]
    UploadsNotConfigured,
}
