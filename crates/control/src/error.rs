//! Error types for the control channel.

use thiserror::Error;

/// Errors on a control connection.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Socket or pipe I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Length prefix was not positive or exceeded the frame limit.
    #[error("Invalid frame length: {0}")]
    InvalidFrameLength(i64),

    /// Response could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `create_file` content flagged as base64 did not decode.
    #[error("Invalid base64 content: {0}")]
    Base64(#[from] data_encoding::DecodeError),

    /// Blocking command task panicked or was cancelled.
    #[error("Command task failed: {0}")]
    Task(String),
}
