//! Shared error type across tagmetrics crates.

use thiserror::Error;

/// Stable error codes, usable in logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Caller defect: missing or invalid argument.
    BadRequest,
    /// Configuration could not be parsed or failed validation.
    InvalidConfig,
    /// Network send or socket setup failed.
    Transport,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TagMetricsError>;

/// Unified error type used by core and reporters.
///
/// `Clone` so that a single send outcome can be handed to every completion
/// callback of a batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TagMetricsError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl TagMetricsError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            TagMetricsError::BadRequest(_) => ErrorCode::BadRequest,
            TagMetricsError::InvalidConfig(_) => ErrorCode::InvalidConfig,
            TagMetricsError::Transport(_) => ErrorCode::Transport,
            TagMetricsError::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<std::io::Error> for TagMetricsError {
    fn from(e: std::io::Error) -> Self {
        TagMetricsError::Transport(e.to_string())
    }
}
