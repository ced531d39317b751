//! Error types for the share_mirror crate.

use thiserror::Error;

/// Errors that can occur while mirroring a share.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Invalid share link: {0}")]
    InvalidLink(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    #[error("Filesystem error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MirrorError {
    /// Whether the error is a transport fault worth another attempt.
    ///
    /// Connection failures, timeouts and non-2xx statuses are transient;
    /// anything the server answered with but we could not understand is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, MirrorError::HttpError(_) | MirrorError::ApiError { .. })
    }
}

/// Result type alias for MirrorError.
pub type Result<T> = std::result::Result<T, MirrorError>;
