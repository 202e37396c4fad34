//! hostd client errors

use thiserror::Error;

/// Errors that can occur when interacting with the hostd API
#[derive(Debug, Error)]
pub enum HostError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The host rejected the request; the message is passed through verbatim
    #[error("{0}")]
    Api(String),

    /// The concurrency token sent with an update no longer matches the resource
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid request (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The host answered with an envelope of the wrong kind
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// A caller-imposed deadline passed before the operation finished
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The operation was cancelled server-side
    #[error("Operation cancelled: {0}")]
    OperationCancelled(String),
}

impl HostError {
    /// Whether this error is a stale-ETag rejection
    pub fn is_conflict(&self) -> bool {
        matches!(self, HostError::Conflict(_))
    }
}
