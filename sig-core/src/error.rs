//! Error types for the signal graph.
//!
//! Application errors and structural errors share one type so they can flow
//! through the same error channel.

use thiserror::Error;

use crate::graph::SignalId;

/// The error type for signal graph operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SigError {
    /// A signal was connected to a second source.
    ///
    /// Raised on `target` through the error channel rather than returned
    /// from `connect` directly.
    #[error("Cannot set signal's source, signal already has a source ({target} <- {existing}, attempted {attempted})")]
    SourceAlreadySet {
        /// The signal that refused the new source.
        target: SignalId,
        /// Its current source.
        existing: SignalId,
        /// The source that was rejected.
        attempted: SignalId,
    },

    /// The handle does not belong to this graph.
    #[error("unknown signal {0}")]
    UnknownSignal(SignalId),

    /// A combinator was given input it cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An application error raised explicitly or returned by a handler.
    #[error("{0}")]
    Message(String),

    /// Configuration could not be parsed.
    #[error("invalid config: {0}")]
    Config(String),
}

impl SigError {
    /// Create an application error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl From<&str> for SigError {
    fn from(message: &str) -> Self {
        Self::msg(message)
    }
}

impl From<String> for SigError {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<serde_json::Error> for SigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
