//! Error types for civant-enrich operations.
//!
//! Each subsystem carries its own error enum: the batch client's lives
//! here, storage and pipeline errors live next to their modules, and the
//! extraction engine has no error type at all (it degrades instead of
//! failing).

use thiserror::Error;

/// Errors that can occur when talking to the Messages Batches API.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Missing API key: ANTHROPIC_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Batch '{batch_id}' has no results yet (status: {status})")]
    ResultsNotReady { batch_id: String, status: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
