//! Platform-level error type.

use thiserror::Error;
use valoisan_types::RelayError;

use crate::messaging::TabId;

/// Failures reported by platform primitives.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PlatformError {
    /// A storage area could not be read or written.
    #[error("storage failure: {0}")]
    Storage(String),

    /// A storage area refused a write because it is full.
    #[error("storage quota exceeded writing '{key}'")]
    QuotaExceeded {
        /// Key being written.
        key: String,
    },

    /// A tab-addressed message targeted a tab that does not exist.
    #[error("no such tab: {0}")]
    TabNotFound(TabId),

    /// The messaging channel has been torn down.
    #[error("messaging channel closed: {0}")]
    ChannelClosed(String),

    /// A selector or XPath expression could not be evaluated.
    #[error("invalid query '{query}': {reason}")]
    InvalidQuery {
        /// The offending expression.
        query: String,
        /// Why evaluation failed.
        reason: String,
    },

    /// A configuration file could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<PlatformError> for RelayError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Storage(_) | PlatformError::QuotaExceeded { .. } => {
                RelayError::Storage(err.to_string())
            }
            PlatformError::TabNotFound(_) => RelayError::Messaging(err.to_string()),
            PlatformError::ChannelClosed(what) => RelayError::Closed(what),
            PlatformError::Config(reason) => RelayError::ConfigInvalid { reason },
            PlatformError::Io(e) => RelayError::Io(e),
            PlatformError::Json(e) => RelayError::Json(e),
            other => RelayError::Messaging(other.to_string()),
        }
    }
}
