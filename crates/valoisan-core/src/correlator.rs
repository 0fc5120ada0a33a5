//! Request/response on top of one-way page events.
//!
//! A call subscribes to `extensionReceiveBackgroundMessage`, dispatches the
//! request, and waits for the first envelope whose action is
//! `"<action>:response"`. Requests carry a fresh `correlationId` and a
//! reply carrying an id must echo it; replies without an id are matched on
//! the action alone, so two concurrent calls of the same action against a
//! background that does not echo ids may both resolve with the same reply.
//!
//! Every call ends in a [`CallOutcome`] and the subscription is dropped on
//! every exit path.

use std::time::Duration;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;
use valoisan_platform::events::{EventSubscription, RECEIVE_BACKGROUND_MESSAGE};
use valoisan_types::config::RelayConfig;
use valoisan_types::envelope::Envelope;
use valoisan_types::error::{RelayError, Result};

use crate::bridge::PageBridge;

/// Default time a call waits for its reply.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// How a call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The matching reply arrived.
    Resolved(Envelope),
    /// No reply within the call timeout.
    TimedOut,
    /// The caller's cancellation token fired first.
    Cancelled,
}

impl CallOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, CallOutcome::Resolved(_))
    }

    /// The reply, if the call resolved.
    pub fn into_resolved(self) -> Option<Envelope> {
        match self {
            CallOutcome::Resolved(envelope) => Some(envelope),
            _ => None,
        }
    }

    /// Short label for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            CallOutcome::Resolved(_) => "resolved",
            CallOutcome::TimedOut => "timed out",
            CallOutcome::Cancelled => "cancelled",
        }
    }
}

/// Page-side request/response client.
pub struct Correlator {
    bridge: PageBridge,
    timeout: Duration,
    correlation_ids: bool,
}

impl Correlator {
    pub fn new(bridge: PageBridge) -> Self {
        Self {
            bridge,
            timeout: DEFAULT_CALL_TIMEOUT,
            correlation_ids: true,
        }
    }

    pub fn from_config(bridge: PageBridge, config: &RelayConfig) -> Self {
        Self {
            bridge,
            timeout: config.call_timeout(),
            correlation_ids: config.correlation_ids,
        }
    }

    /// Builder: override the call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder: stop tagging requests with correlation ids.
    pub fn without_correlation_ids(mut self) -> Self {
        self.correlation_ids = false;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn bridge(&self) -> &PageBridge {
        &self.bridge
    }

    /// Fire-and-forget: dispatch a request without waiting for anything.
    pub fn send(&self, action: &str, data: Option<Map<String, Value>>) -> Result<()> {
        self.bridge.send(action, data)
    }

    /// Dispatch a request and wait for its reply, up to the call timeout.
    pub async fn call(&self, action: &str, data: Option<Map<String, Value>>) -> Result<CallOutcome> {
        self.call_with_cancel(action, data, &CancellationToken::new())
            .await
    }

    /// Like [`call`](Self::call), but also ends early when `cancel` fires.
    ///
    /// Errors only when the request cannot be serialized or the page's
    /// event target has gone away.
    pub async fn call_with_cancel(
        &self,
        action: &str,
        data: Option<Map<String, Value>>,
        cancel: &CancellationToken,
    ) -> Result<CallOutcome> {
        let mut envelope = Envelope::with_data(action, data);
        if self.correlation_ids {
            envelope.correlation_id = Some(Uuid::new_v4().to_string());
        }
        let correlation_id = envelope.correlation_id.clone();

        // Subscribe first: a reply dispatched synchronously must not be missed.
        let mut subscription = self.bridge.events().add_listener(RECEIVE_BACKGROUND_MESSAGE);
        self.bridge.post(&envelope)?;

        let wait = wait_for_reply(&mut subscription, action, correlation_id.as_deref());
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => CallOutcome::Cancelled,
            result = tokio::time::timeout(self.timeout, wait) => match result {
                Ok(Some(reply)) => CallOutcome::Resolved(reply),
                Ok(None) => {
                    return Err(RelayError::Closed("page event target".into()));
                }
                Err(_) => CallOutcome::TimedOut,
            },
        };

        match &outcome {
            CallOutcome::Resolved(_) => debug!(action, "call resolved"),
            other => warn!(
                action,
                correlation_id = correlation_id.as_deref().unwrap_or(""),
                outcome = other.kind(),
                "call ended without a reply"
            ),
        }
        Ok(outcome)
    }
}

async fn wait_for_reply(
    subscription: &mut EventSubscription,
    action: &str,
    correlation_id: Option<&str>,
) -> Option<Envelope> {
    while let Some(event) = subscription.recv().await {
        let Some(detail) = event.detail_text() else {
            warn!(event_type = %event.event_type, "invalid event: detail is not a string");
            continue;
        };
        match Envelope::from_json(detail) {
            Ok(reply) if reply.is_reply_to(action, correlation_id) => return Some(reply),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "ignoring malformed background message"),
        }
    }
    None
}
