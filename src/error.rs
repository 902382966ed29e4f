//! Error types for the latency pipeline
//!
//! Every fallible operation in the crate returns [`Result`]. Errors are grouped
//! into a small taxonomy ([`FailureKind`]) so the dashboard can show a single
//! generic failure notice while logs keep the precise cause.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, LatenciaError>;

/// Errors produced while fetching, validating or transforming metrics
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LatenciaError {
    /// Request rejected, timed out or answered with a non-success status
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Payload violates the distribution/aggregate invariants
    #[error("Malformed metrics payload: {reason}")]
    TransformFault {
        /// What was wrong with the payload
        reason: String,
    },

    /// Well-formed response that carries no usable series
    #[error("No data available: {what}")]
    EmptyResult {
        /// Which part of the dashboard came back empty
        what: String,
    },

    /// Selection that is not valid for the current date axis
    #[error("Invalid selection: {reason}")]
    InvalidSelection {
        /// Why the selection was refused
        reason: String,
    },

    /// Configuration value out of range or unparsable
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Filesystem or terminal I/O failure
    #[error("I/O error: {message}")]
    IoError {
        /// Underlying error message
        message: String,
    },
}

/// Coarse classification of [`LatenciaError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Transport-level failure
    NetworkFailure,
    /// Nothing to plot
    EmptyResult,
    /// Malformed input (a defect, not a user error)
    TransformFault,
    /// Anything else (configuration, selection, I/O)
    Other,
}

impl LatenciaError {
    /// Shorthand for [`LatenciaError::TransformFault`]
    pub fn fault(reason: impl Into<String>) -> Self {
        Self::TransformFault {
            reason: reason.into(),
        }
    }

    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ConnectionError(_) => FailureKind::NetworkFailure,
            Self::EmptyResult { .. } => FailureKind::EmptyResult,
            Self::TransformFault { .. } => FailureKind::TransformFault,
            Self::InvalidSelection { .. } | Self::InvalidConfiguration(_) | Self::IoError { .. } => {
                FailureKind::Other
            },
        }
    }
}

impl From<std::io::Error> for LatenciaError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            message: err.to_string(),
        }
    }
}
