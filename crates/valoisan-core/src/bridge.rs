//! Transport bridge between the page script and extension messaging.
//!
//! The page side ([`PageBridge`]) can only dispatch custom events on the
//! document. The privileged side ([`BootListener`]) runs in the content
//! script, where it has both the document and the extension messaging
//! API, and relays in both directions:
//!
//! - `extensionSendBackgroundMessage` events are parsed and forwarded with
//!   `runtime.sendMessage`.
//! - Every message the background sends to this tab is re-serialized and
//!   dispatched as an `extensionReceiveBackgroundMessage` event.

use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use valoisan_platform::events::{
    CustomEvent, EventSubscription, PageEvents, RECEIVE_BACKGROUND_MESSAGE,
    SEND_BACKGROUND_MESSAGE,
};
use valoisan_platform::messaging::ContentMessaging;
use valoisan_types::envelope::Envelope;
use valoisan_types::error::Result;

/// The page script's end of the bridge.
#[derive(Clone)]
pub struct PageBridge {
    events: Arc<dyn PageEvents>,
}

impl PageBridge {
    pub fn new(events: Arc<dyn PageEvents>) -> Self {
        Self { events }
    }

    /// The document event target the bridge dispatches on.
    pub fn events(&self) -> &Arc<dyn PageEvents> {
        &self.events
    }

    /// Package `{action, ...data}` and dispatch it towards the background.
    ///
    /// Fire-and-forget: nothing confirms that a listener picked it up.
    pub fn send(&self, action: &str, data: Option<Map<String, Value>>) -> Result<()> {
        self.post(&Envelope::with_data(action, data))?;
        Ok(())
    }

    /// Dispatch an already-built envelope. Returns the number of listeners
    /// that received the event.
    pub fn post(&self, envelope: &Envelope) -> Result<usize> {
        let detail = envelope.to_json()?;
        let delivered = self
            .events
            .dispatch_event(CustomEvent::text(SEND_BACKGROUND_MESSAGE, detail));
        debug!(
            action = %envelope.action,
            correlation_id = envelope.correlation_id.as_deref().unwrap_or(""),
            delivered,
            "sending background message"
        );
        Ok(delivered)
    }
}

struct Running {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// The content script's relay between page events and runtime messaging.
///
/// Constructed explicitly and driven with [`start`](Self::start) /
/// [`stop`](Self::stop); nothing is registered on construction.
pub struct BootListener {
    events: Arc<dyn PageEvents>,
    messaging: Arc<dyn ContentMessaging>,
    running: Mutex<Option<Running>>,
}

impl BootListener {
    pub fn new(events: Arc<dyn PageEvents>, messaging: Arc<dyn ContentMessaging>) -> Self {
        Self {
            events,
            messaging,
            running: Mutex::new(None),
        }
    }

    /// Install both relay directions.
    ///
    /// The page listener is registered before this returns, so events
    /// dispatched right after `start` are not missed. Returns `false` and
    /// does nothing if the listener is already running.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock().expect("BootListener mutex poisoned");
        if running.is_some() {
            debug!("boot listener already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let subscription = self.events.add_listener(SEND_BACKGROUND_MESSAGE);

        let outbound = tokio::spawn(relay_outbound(
            subscription,
            Arc::clone(&self.messaging),
            cancel.clone(),
        ));
        let inbound = tokio::spawn(relay_inbound(
            Arc::clone(&self.events),
            Arc::clone(&self.messaging),
            cancel.clone(),
        ));

        *running = Some(Running {
            cancel,
            tasks: vec![outbound, inbound],
        });
        info!("boot listener started");
        true
    }

    /// Cancel both relay loops and wait for them to exit.
    ///
    /// Stopping a listener that is not running is a no-op.
    pub async fn stop(&self) {
        let running = self
            .running
            .lock()
            .expect("BootListener mutex poisoned")
            .take();
        let Some(running) = running else {
            return;
        };

        running.cancel.cancel();
        for task in running.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "boot listener task panicked");
            }
        }
        info!("boot listener stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .expect("BootListener mutex poisoned")
            .is_some()
    }
}

impl Drop for BootListener {
    fn drop(&mut self) {
        if let Ok(mut running) = self.running.lock()
            && let Some(running) = running.take()
        {
            running.cancel.cancel();
        }
    }
}

/// Page -> background.
async fn relay_outbound(
    mut subscription: EventSubscription,
    messaging: Arc<dyn ContentMessaging>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = subscription.recv() => event,
        };
        let Some(event) = event else {
            debug!("page event target closed");
            break;
        };

        let Some(detail) = event.detail_text() else {
            warn!(event_type = %event.event_type, "invalid event: detail is not a string");
            continue;
        };
        let payload: Value = match serde_json::from_str(detail) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, detail, "dropping unparseable page message");
                continue;
            }
        };

        debug!(payload = %payload, "forwarding page message to background");
        if let Err(e) = messaging.send_message(payload).await {
            warn!(error = %e, "failed to forward page message");
        }
    }
}

/// Background -> page.
async fn relay_inbound(
    events: Arc<dyn PageEvents>,
    messaging: Arc<dyn ContentMessaging>,
    cancel: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            message = messaging.recv_message() => message,
        };
        let Some(message) = message else {
            debug!("runtime messaging closed");
            break;
        };

        let detail = match serde_json::to_string(&message) {
            Ok(detail) => detail,
            Err(e) => {
                warn!(error = %e, "dropping unserializable background message");
                continue;
            }
        };
        debug!(detail = %detail, "relaying background message to page");
        events.dispatch_event(CustomEvent::text(RECEIVE_BACKGROUND_MESSAGE, detail));
    }
}
