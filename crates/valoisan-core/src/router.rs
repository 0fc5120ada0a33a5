//! Background message router.
//!
//! Owns the canonical preference record. Each message from a content
//! script is parsed into a [`Request`] and handled exactly once; replies
//! go back to the sender's tab with the request's correlation id echoed.
//! Every failure degrades to "no reply" and is logged.

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use valoisan_platform::messaging::{BackgroundMessaging, RuntimeMessage, TabId};
use valoisan_platform::storage::ExtensionStorage;
use valoisan_types::config::RelayConfig;
use valoisan_types::envelope::Envelope;
use valoisan_types::request::Request;
use valoisan_types::state::CANONICAL_STATE_KEY;

/// Why a message produced no reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Not an object with a non-empty string `action`.
    InvalidMessage,
    /// The sender has no tab to reply to.
    NoSender,
    /// The action is outside the known set.
    UnknownAction(String),
    /// Reading or writing canonical storage failed.
    StorageFailed,
    /// The reply could not be built or delivered.
    ReplyFailed,
}

/// What the router did with one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// A reply was delivered to the sender's tab.
    Replied(Envelope),
    /// `setState` was applied. No reply is ever sent for it.
    Stored,
    /// Nothing was replied.
    Dropped(DropReason),
}

/// The background context's request handler.
pub struct BackgroundRouter {
    storage: Arc<dyn ExtensionStorage>,
    messaging: Arc<dyn BackgroundMessaging>,
    state_key: String,
    running: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl BackgroundRouter {
    pub fn new(storage: Arc<dyn ExtensionStorage>, messaging: Arc<dyn BackgroundMessaging>) -> Self {
        Self {
            storage,
            messaging,
            state_key: CANONICAL_STATE_KEY.to_owned(),
            running: Mutex::new(None),
        }
    }

    pub fn from_config(
        storage: Arc<dyn ExtensionStorage>,
        messaging: Arc<dyn BackgroundMessaging>,
        config: &RelayConfig,
    ) -> Self {
        Self::new(storage, messaging).with_state_key(&config.canonical_state_key)
    }

    /// Builder: store the record under a different key.
    pub fn with_state_key(mut self, key: &str) -> Self {
        self.state_key = key.to_owned();
        self
    }

    /// Consume the background inbox on a spawned task until stopped.
    ///
    /// Returns `false` if the router is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut running = self.running.lock().expect("BackgroundRouter mutex poisoned");
        if running.is_some() {
            return false;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let router = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    _ = token.cancelled() => break,
                    message = router.messaging.recv_message() => message,
                };
                match message {
                    Some(message) => {
                        router.handle(message).await;
                    }
                    None => {
                        debug!("background inbox closed");
                        break;
                    }
                }
            }
        });

        *running = Some((cancel, handle));
        info!(state_key = %self.state_key, "background router started");
        true
    }

    /// Stop consuming the inbox and wait for the loop to exit.
    pub async fn stop(&self) {
        let running = self
            .running
            .lock()
            .expect("BackgroundRouter mutex poisoned")
            .take();
        if let Some((cancel, handle)) = running {
            cancel.cancel();
            if let Err(e) = handle.await {
                warn!(error = %e, "background router task panicked");
            }
            info!("background router stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .expect("BackgroundRouter mutex poisoned")
            .is_some()
    }

    /// Handle one message.
    pub async fn handle(&self, message: RuntimeMessage) -> Dispatch {
        let RuntimeMessage { payload, sender } = message;
        info!(payload = %payload, tab_id = ?sender.tab_id, "received background message");

        let envelope = match Envelope::from_value(payload) {
            Ok(envelope) if !envelope.action.is_empty() => envelope,
            Ok(_) => {
                warn!("invalid message: empty action");
                return Dispatch::Dropped(DropReason::InvalidMessage);
            }
            Err(e) => {
                warn!(error = %e, "invalid message");
                return Dispatch::Dropped(DropReason::InvalidMessage);
            }
        };
        let Some(tab) = sender.tab_id else {
            warn!(action = %envelope.action, "invalid message: sender has no tab");
            return Dispatch::Dropped(DropReason::NoSender);
        };

        let request = Request::from_envelope(&envelope);
        debug!(
            action = request.action(),
            expects_reply = request.expects_reply(),
            tab_id = tab,
            "dispatching request"
        );
        match request {
            Request::GetState => match self.storage.get(&self.state_key).await {
                Ok(stored) => {
                    let state = match stored {
                        Some(value) if !value.is_null() => value,
                        _ => json!({}),
                    };
                    self.reply(tab, envelope.reply().with_field("state", state))
                        .await
                }
                Err(e) => {
                    warn!(error = %e, key = %self.state_key, "failed to get state from storage");
                    Dispatch::Dropped(DropReason::StorageFailed)
                }
            },
            Request::SetState { state } => {
                match self.storage.set(&self.state_key, state).await {
                    Ok(()) => {
                        debug!(key = %self.state_key, "state stored");
                        Dispatch::Stored
                    }
                    Err(e) => {
                        warn!(error = %e, key = %self.state_key, "failed to set state in storage");
                        Dispatch::Dropped(DropReason::StorageFailed)
                    }
                }
            }
            Request::GetManifest => match self.messaging.manifest().to_value() {
                Ok(manifest) => {
                    self.reply(tab, envelope.reply().with_field("manifest", manifest))
                        .await
                }
                Err(e) => {
                    warn!(error = %e, "failed to serialize manifest");
                    Dispatch::Dropped(DropReason::ReplyFailed)
                }
            },
            Request::Unknown { action } => {
                warn!(action = %action, "rejecting unknown action");
                Dispatch::Dropped(DropReason::UnknownAction(action))
            }
        }
    }

    async fn reply(&self, tab: TabId, reply: Envelope) -> Dispatch {
        let payload: Value = match reply.to_value() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, action = %reply.action, "failed to serialize reply");
                return Dispatch::Dropped(DropReason::ReplyFailed);
            }
        };
        match self.messaging.send_to_tab(tab, payload).await {
            Ok(()) => {
                debug!(tab_id = tab, action = %reply.action, "reply sent");
                Dispatch::Replied(reply)
            }
            Err(e) => {
                warn!(error = %e, tab_id = tab, action = %reply.action, "failed to deliver reply");
                Dispatch::Dropped(DropReason::ReplyFailed)
            }
        }
    }
}
