//! Errors raised by store operations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes reported by the note service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadDataFormat,
    DataRequired,
    DataConflict,
    PermissionDenied,
    LimitReached,
    InvalidAuth,
    Internal,
}

impl ErrorCode {
    /// Wire name of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadDataFormat => "BAD_DATA_FORMAT",
            ErrorCode::DataRequired => "DATA_REQUIRED",
            ErrorCode::DataConflict => "DATA_CONFLICT",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::LimitReached => "LIMIT_REACHED",
            ErrorCode::InvalidAuth => "INVALID_AUTH",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a store operation
///
/// The gateway never wraps or translates these; the transport decides how
/// each is reported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreError {
    /// The caller supplied bad or conflicting data
    #[error("{code} on [{parameter}]")]
    User { code: ErrorCode, parameter: String },

    /// The referenced object does not exist
    #[error("{identifier} not found: [{key}]")]
    NotFound { identifier: String, key: String },

    /// The service failed on its own account
    #[error("system error {code}: {message}")]
    System { code: ErrorCode, message: String },
}

impl StoreError {
    pub fn required(parameter: &str) -> Self {
        StoreError::User {
            code: ErrorCode::DataRequired,
            parameter: parameter.to_string(),
        }
    }

    pub fn conflict(parameter: &str) -> Self {
        StoreError::User {
            code: ErrorCode::DataConflict,
            parameter: parameter.to_string(),
        }
    }

    pub fn not_found(identifier: &str, key: impl Into<String>) -> Self {
        StoreError::NotFound {
            identifier: identifier.to_string(),
            key: key.into(),
        }
    }

    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::User { .. } => "store_user_error",
            StoreError::NotFound { .. } => "store_not_found",
            StoreError::System { .. } => "store_system_error",
        }
    }
}

/// Result of a store operation
pub type StoreResult<T> = std::result::Result<T, StoreError>;
