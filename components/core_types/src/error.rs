//! Error types for asynchronous operations.
//!
//! A rejected deferred value carries an [`AsyncError`]. Errors are cloned into
//! every continuation that observes the rejection, so they are plain data.

use serde::Serialize;

/// The kind of failure carried by an [`AsyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// The data source could not deliver the resource
    TransportFailure,
    /// A response arrived but its body could not be decoded
    DecodeFailure,
    /// The event loop exceeded its task budget without draining
    StarvationFault,
    /// The event loop or a deferred value was misused
    Internal,
}

impl ErrorKind {
    /// Short, stable name used in logs and rendered traces.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::TransportFailure => "transport failure",
            ErrorKind::DecodeFailure => "decode failure",
            ErrorKind::StarvationFault => "starvation fault",
            ErrorKind::Internal => "internal error",
        }
    }
}

/// An error produced by an asynchronous operation.
///
/// # Examples
///
/// ```
/// use core_types::{AsyncError, ErrorKind};
///
/// let error = AsyncError::new(ErrorKind::DecodeFailure, "missing field `name`");
/// assert_eq!(error.to_string(), "decode failure: missing field `name`");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, thiserror::Error)]
#[error("{}: {message}", .kind.as_str())]
pub struct AsyncError {
    /// The failure category
    pub kind: ErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl AsyncError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a [`ErrorKind::TransportFailure`] error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransportFailure, message)
    }

    /// Creates a [`ErrorKind::DecodeFailure`] error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DecodeFailure, message)
    }

    /// Creates a [`ErrorKind::StarvationFault`] error.
    pub fn starvation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StarvationFault, message)
    }

    /// Creates a [`ErrorKind::Internal`] error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}
