//! The closed set of requests understood by the background context.

use serde_json::Value;

use crate::envelope::Envelope;

/// Action tag: read the canonical preference record.
pub const GET_STATE: &str = "getState";

/// Action tag: overwrite the canonical preference record.
pub const SET_STATE: &str = "setState";

/// Action tag: read the extension manifest.
pub const GET_MANIFEST: &str = "getManifest";

/// A request received by the background router.
///
/// Parsed from an [`Envelope`] with [`Request::from_envelope`]. Actions
/// outside the known set land in [`Request::Unknown`] so the router can
/// match exhaustively and log a rejection.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// `getState` -- replied with `{state}`.
    GetState,
    /// `setState` -- fire-and-forget, never replied.
    ///
    /// `state` is whatever the sender put in the envelope, `Null` if absent.
    SetState { state: Value },
    /// `getManifest` -- replied with `{manifest}`.
    GetManifest,
    /// Any other action.
    Unknown { action: String },
}

impl Request {
    /// Classify an envelope by its action.
    pub fn from_envelope(envelope: &Envelope) -> Self {
        match envelope.action.as_str() {
            GET_STATE => Request::GetState,
            SET_STATE => Request::SetState {
                state: envelope.field("state").cloned().unwrap_or(Value::Null),
            },
            GET_MANIFEST => Request::GetManifest,
            other => Request::Unknown {
                action: other.to_owned(),
            },
        }
    }

    /// The wire action for this request.
    pub fn action(&self) -> &str {
        match self {
            Request::GetState => GET_STATE,
            Request::SetState { .. } => SET_STATE,
            Request::GetManifest => GET_MANIFEST,
            Request::Unknown { action } => action,
        }
    }

    /// Whether the background replies to this request.
    pub fn expects_reply(&self) -> bool {
        matches!(self, Request::GetState | Request::GetManifest)
    }
}
