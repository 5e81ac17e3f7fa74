//! Unified SDK error types.

use thiserror::Error;

/// Top-level SDK error.
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("SSE error: {0}")]
    Sse(#[from] SseError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Event-stream errors.
///
/// `Clone` so the most recent error can live inside a state snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SseError {
    #[error("No tokio runtime available to drive the connection")]
    NoRuntime,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timed out after {0}ms")]
    Timeout(u64),

    #[error("Unexpected HTTP status {status}")]
    BadStatus { status: u16 },

    #[error("Unexpected content type: {0}")]
    UnexpectedContentType(String),

    #[error("Stream read failed: {0}")]
    Read(String),

    #[error("Stream ended by server")]
    StreamEnded,

    #[error("Failed to parse event payload: {0}")]
    MessageParseError(String),

    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

impl SseError {
    /// Whether this error came from the connection rather than a single payload.
    ///
    /// Transport errors drive the reconnection policy; payload errors are dropped.
    pub fn is_transport(&self) -> bool {
        !matches!(self, SseError::MessageParseError(_))
    }
}

impl From<serde_json::Error> for SseError {
    fn from(err: serde_json::Error) -> Self {
        SseError::MessageParseError(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for SseError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return SseError::BadStatus {
                status: status.as_u16(),
            };
        }
        if err.is_connect() || err.is_request() || err.is_builder() {
            SseError::ConnectionFailed(err.to_string())
        } else {
            SseError::Read(err.to_string())
        }
    }
}

/// Result type alias for stream operations.
pub type SseResult<T> = Result<T, SseError>;
