use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias used by every safety component.
pub type SafetyResult<T> = std::result::Result<T, SafetyError>;

/// Coarse classification of a [`SafetyError`].
///
/// Callers branch on the kind rather than on individual variants so that new
/// variants can carry extra context without breaking existing handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    NoOperation,
    NotReversible,
    NotSupported,
    IntegrityError,
    TooLarge,
    Timeout,
    PermissionDenied,
    ElevationUnavailable,
    PolicyBlocked,
    Io,
    Journal,
    InvalidPattern,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::NoOperation => "no_operation",
            Self::NotReversible => "not_reversible",
            Self::NotSupported => "not_supported",
            Self::IntegrityError => "integrity_error",
            Self::TooLarge => "too_large",
            Self::Timeout => "timeout",
            Self::PermissionDenied => "permission_denied",
            Self::ElevationUnavailable => "elevation_unavailable",
            Self::PolicyBlocked => "policy_blocked",
            Self::Io => "io",
            Self::Journal => "journal",
            Self::InvalidPattern => "invalid_pattern",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the safety layer.
#[derive(Debug, Error)]
pub enum SafetyError {
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("nothing to {action}")]
    NoOperation { action: &'static str },

    #[error("operation is not reversible: {reason}")]
    NotReversible { reason: String },

    #[error("{operation} is not supported: {reason}")]
    NotSupported {
        operation: &'static str,
        reason: String,
    },

    #[error("integrity check failed for '{path}': expected {expected}, found {actual}")]
    IntegrityError {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("'{path}' is {size} bytes which exceeds the {limit} byte limit")]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("{what} timed out after {millis}ms")]
    Timeout { what: String, millis: u128 },

    #[error("permission denied for '{path}': {reason}")]
    PermissionDenied { path: PathBuf, reason: String },

    #[error("elevation unavailable: {reason}")]
    ElevationUnavailable { reason: String },

    #[error("operation '{operation}' is blocked by policy")]
    PolicyBlocked { operation: String },

    #[error("I/O error while {action} '{path}': {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("journal error for '{path}': {message}")]
    Journal { path: PathBuf, message: String },

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl SafetyError {
    /// Build an [`SafetyError::Io`] from an I/O failure on `path`.
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn not_found(what: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NoOperation { .. } => ErrorKind::NoOperation,
            Self::NotReversible { .. } => ErrorKind::NotReversible,
            Self::NotSupported { .. } => ErrorKind::NotSupported,
            Self::IntegrityError { .. } => ErrorKind::IntegrityError,
            Self::TooLarge { .. } => ErrorKind::TooLarge,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::ElevationUnavailable { .. } => ErrorKind::ElevationUnavailable,
            Self::PolicyBlocked { .. } => ErrorKind::PolicyBlocked,
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ErrorKind::NotFound
            }
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::PermissionDenied => {
                ErrorKind::PermissionDenied
            }
            Self::Io { .. } => ErrorKind::Io,
            Self::Journal { .. } => ErrorKind::Journal,
            Self::InvalidPattern { .. } => ErrorKind::InvalidPattern,
        }
    }
}
