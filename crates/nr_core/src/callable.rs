//! Error taxonomy shared by every callable entry point.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    InvalidArgument,
    Unauthenticated,
    FailedPrecondition,
    NotFound,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "invalid-argument",
            ErrorCode::Unauthenticated => "unauthenticated",
            ErrorCode::FailedPrecondition => "failed-precondition",
            ErrorCode::NotFound => "not-found",
            ErrorCode::Internal => "internal",
        }
    }

    /// Upper-snake status used in the callable error envelope
    pub fn status(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::FailedPrecondition => "FAILED_PRECONDITION",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error surfaced to a caller. The message is safe to show; backend details
/// are logged where the error is produced and never copied in here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct CallableError {
    pub code: ErrorCode,
    pub message: String,
}

impl CallableError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    pub fn unauthenticated() -> Self {
        Self::new(ErrorCode::Unauthenticated, "The function must be called while authenticated.")
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::FailedPrecondition, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

pub type CallResult<T> = std::result::Result<T, CallableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_names() {
        assert_eq!(ErrorCode::FailedPrecondition.as_str(), "failed-precondition");
        assert_eq!(ErrorCode::InvalidArgument.status(), "INVALID_ARGUMENT");
        let err = CallableError::unauthenticated();
        assert_eq!(err.to_string(), "unauthenticated: The function must be called while authenticated.");
    }
}
