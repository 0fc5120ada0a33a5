//! Same-document custom events.
//!
//! The injected page script has no access to extension APIs. The only
//! channel it shares with the content script is the document's event
//! target, so both directions of the relay travel as [`CustomEvent`]s
//! whose detail is the JSON text of an envelope.
//!
//! Any code in the page that listens for these event types sees all
//! traffic. The channel is neither isolated nor authenticated.

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::warn;

/// Page -> content script: detail is the JSON text of a request envelope.
pub const SEND_BACKGROUND_MESSAGE: &str = "extensionSendBackgroundMessage";

/// Content script -> page: detail is the JSON text of a background message.
pub const RECEIVE_BACKGROUND_MESSAGE: &str = "extensionReceiveBackgroundMessage";

/// The `detail` payload of a custom event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventDetail {
    /// A string detail -- the only form the relay produces.
    Text(String),
    /// A structured detail dispatched by other page code.
    Structured(Value),
    /// No detail.
    Empty,
}

/// A DOM `CustomEvent`.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEvent {
    pub event_type: String,
    pub detail: EventDetail,
}

impl CustomEvent {
    /// Create an event carrying a string detail.
    pub fn text(event_type: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            detail: EventDetail::Text(detail.into()),
        }
    }

    /// The detail, if it is a string.
    pub fn detail_text(&self) -> Option<&str> {
        match &self.detail {
            EventDetail::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// A registered listener for one event type.
///
/// Dropping the subscription removes the listener.
pub struct EventSubscription {
    event_type: String,
    rx: broadcast::Receiver<CustomEvent>,
}

impl EventSubscription {
    pub fn new(event_type: impl Into<String>, rx: broadcast::Receiver<CustomEvent>) -> Self {
        Self {
            event_type: event_type.into(),
            rx,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the event target is gone. If the listener fell
    /// behind and events were overwritten, the gap is logged and the
    /// oldest retained event is returned.
    pub async fn recv(&mut self) -> Option<CustomEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        event_type = %self.event_type,
                        skipped,
                        "event listener lagged, events dropped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// The document's event target.
pub trait PageEvents: Send + Sync {
    /// Dispatch an event to every current listener of its type.
    ///
    /// Returns the number of listeners that received it. Events with no
    /// listener are dropped, as in the DOM.
    fn dispatch_event(&self, event: CustomEvent) -> usize;

    /// Register a listener for `event_type`.
    fn add_listener(&self, event_type: &str) -> EventSubscription;

    /// Number of live listeners for `event_type`.
    fn listener_count(&self, event_type: &str) -> usize;
}
