use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ServerUnavailable,
    Validation,
    RemoteRejected,
    Busy,
}

/// Local precondition failures detected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please upload an image first")]
    MissingImage,
    #[error("Please add at least 3 landmarks for both source and destination")]
    TooFewLandmarks { source_count: usize, dest_count: usize },
    #[error("Source and destination must have the same number of landmarks")]
    LengthMismatch { source_count: usize, dest_count: usize },
}

/// The single user-visible error recorded by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SessionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<ValidationError> for SessionError {
    fn from(value: ValidationError) -> Self {
        Self::new(ErrorKind::Validation, value.to_string())
    }
}
