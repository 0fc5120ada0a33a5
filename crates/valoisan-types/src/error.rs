//! Error types for the valoisan relay.
//!
//! [`RelayError`] is shared by every crate in the workspace. It is
//! non-exhaustive to allow future extension without breaking downstream.

use thiserror::Error;

/// Top-level error type for relay, storage and configuration failures.
///
/// None of these are surfaced to the page: the protocol degrades to
/// "nothing happens" and the error is only logged. They exist so that
/// internal layers can propagate with `?` up to the point where the
/// failure is logged and swallowed.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An envelope did not have the `{action, ...}` shape.
    #[error("invalid envelope: {reason}")]
    InvalidEnvelope {
        /// What is wrong with the envelope.
        reason: String,
    },

    /// Reading or writing persisted state failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The structured messaging channel rejected a message.
    #[error("messaging error: {0}")]
    Messaging(String),

    /// A relay or channel was used after it had been shut down.
    #[error("channel closed: {0}")]
    Closed(String),

    /// Configuration is malformed or semantically invalid.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the valoisan crates.
pub type Result<T> = std::result::Result<T, RelayError>;
