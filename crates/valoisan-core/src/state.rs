//! Preference record load/save for a page session.
//!
//! The background's extension storage holds the canonical record. The
//! page's `localStorage` holds a legacy mirror written on every save and
//! read only when the canonical record is empty, which migrates users of
//! versions that kept preferences in the page.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde_json::Map;
use thiserror::Error;
use tracing::{debug, info, warn};
use valoisan_platform::PlatformError;
use valoisan_platform::storage::LocalStorage;
use valoisan_types::config::RelayConfig;
use valoisan_types::error::RelayError;
use valoisan_types::request::{GET_STATE, SET_STATE};
use valoisan_types::state::{LEGACY_STATE_KEY, PreferenceState, is_empty_record};

use crate::correlator::{CallOutcome, Correlator};

/// Failures of [`StateStore::load`] and [`SessionState::save`].
#[derive(Error, Debug)]
pub enum StateError {
    /// The `getState` call ended without a reply.
    #[error("canonical state unavailable: getState {0}")]
    Unavailable(&'static str),

    /// The synchronous mirror write failed.
    #[error("failed to write legacy state mirror: {0}")]
    LegacyWrite(#[source] PlatformError),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// Loads the preference record for the current page.
pub struct StateStore {
    correlator: Arc<Correlator>,
    local: Arc<dyn LocalStorage>,
    legacy_key: String,
}

impl StateStore {
    pub fn new(correlator: Arc<Correlator>, local: Arc<dyn LocalStorage>) -> Self {
        Self {
            correlator,
            local,
            legacy_key: LEGACY_STATE_KEY.to_owned(),
        }
    }

    pub fn from_config(
        correlator: Arc<Correlator>,
        local: Arc<dyn LocalStorage>,
        config: &RelayConfig,
    ) -> Self {
        Self::new(correlator, local).with_legacy_key(&config.legacy_state_key)
    }

    /// Builder: mirror under a different `localStorage` key.
    pub fn with_legacy_key(mut self, key: &str) -> Self {
        self.legacy_key = key.to_owned();
        self
    }

    /// Fetch the record: canonical first, then the legacy mirror, then
    /// empty. `receiveAll` defaults to `true`.
    pub async fn load(&self) -> Result<SessionState, StateError> {
        let outcome = self.correlator.call(GET_STATE, None).await?;
        let response = match outcome {
            CallOutcome::Resolved(response) => response,
            other => return Err(StateError::Unavailable(other.kind())),
        };
        debug!(response = ?response.field("state"), "response from getState");

        let canonical = response.field("state").filter(|value| !is_empty_record(value));
        let mut state = match canonical {
            Some(value) => PreferenceState::from_value(value.clone()).unwrap_or_else(|e| {
                warn!(error = %e, "ignoring unreadable canonical state");
                self.read_legacy()
            }),
            None => self.read_legacy(),
        };
        state.apply_defaults();

        Ok(SessionState {
            state,
            correlator: Arc::clone(&self.correlator),
            local: Arc::clone(&self.local),
            legacy_key: self.legacy_key.clone(),
        })
    }

    fn read_legacy(&self) -> PreferenceState {
        let Some(text) = self.local.get_item(&self.legacy_key) else {
            return PreferenceState::default();
        };
        if text.is_empty() {
            return PreferenceState::default();
        }
        match PreferenceState::from_json(&text) {
            Ok(state) => {
                info!(key = %self.legacy_key, "migrating preferences from legacy mirror");
                state
            }
            Err(e) => {
                warn!(error = %e, key = %self.legacy_key, "ignoring unreadable legacy state");
                PreferenceState::default()
            }
        }
    }
}

/// The loaded record plus the capability to persist it.
///
/// Dereferences to [`PreferenceState`], so fields are read and mutated in
/// place; [`save`](Self::save) writes whatever the record holds at that
/// moment.
pub struct SessionState {
    state: PreferenceState,
    correlator: Arc<Correlator>,
    local: Arc<dyn LocalStorage>,
    legacy_key: String,
}

impl SessionState {
    /// Persist the record.
    ///
    /// The legacy mirror is written synchronously and is complete when
    /// this returns. The canonical write is a fire-and-forget `setState`
    /// with no acknowledgement.
    pub fn save(&self) -> Result<(), StateError> {
        let value = self.state.to_value()?;
        info!(state = %value, "saving state");

        self.local
            .set_item(&self.legacy_key, &value.to_string())
            .map_err(StateError::LegacyWrite)?;

        let mut data = Map::new();
        data.insert("state".into(), value);
        self.correlator.send(SET_STATE, Some(data))?;
        Ok(())
    }

    pub fn snapshot(&self) -> &PreferenceState {
        &self.state
    }

    pub fn into_inner(self) -> PreferenceState {
        self.state
    }
}

impl Deref for SessionState {
    type Target = PreferenceState;

    fn deref(&self) -> &PreferenceState {
        &self.state
    }
}

impl DerefMut for SessionState {
    fn deref_mut(&mut self) -> &mut PreferenceState {
        &mut self.state
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("state", &self.state)
            .field("legacy_key", &self.legacy_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::PageBridge;
    use serde_json::{Value, json};
    use std::time::Duration;
    use valoisan_platform::browser::{MemoryDocument, MemoryLocalStorage};
    use valoisan_platform::events::{
        CustomEvent, PageEvents, RECEIVE_BACKGROUND_MESSAGE, SEND_BACKGROUND_MESSAGE,
    };
    use valoisan_types::envelope::Envelope;

    /// A page whose fake background answers `getState` with `canonical`
    /// and records every other request.
    struct Page {
        doc: Arc<MemoryDocument>,
        correlator: Arc<Correlator>,
        sent: tokio::sync::mpsc::UnboundedReceiver<Envelope>,
    }

    fn page(canonical: Option<Value>) -> Page {
        let doc = Arc::new(MemoryDocument::new());
        let (tx, sent) = tokio::sync::mpsc::unbounded_channel();
        let mut requests = doc.add_listener(SEND_BACKGROUND_MESSAGE);
        let responder = doc.clone();
        tokio::spawn(async move {
            while let Some(event) = requests.recv().await {
                let request = Envelope::from_json(event.detail_text().unwrap()).unwrap();
                if request.action == GET_STATE {
                    if let Some(state) = &canonical {
                        let reply = request.reply().with_field("state", state.clone());
                        responder.dispatch_event(CustomEvent::text(
                            RECEIVE_BACKGROUND_MESSAGE,
                            reply.to_json().unwrap(),
                        ));
                    }
                } else {
                    let _ = tx.send(request);
                }
            }
        });
        let correlator = Arc::new(
            Correlator::new(PageBridge::new(doc.clone())).with_timeout(Duration::from_millis(100)),
        );
        Page {
            doc,
            correlator,
            sent,
        }
    }

    #[tokio::test]
    async fn canonical_record_wins() {
        let p = page(Some(json!({"token": "canonical", "receiveAll": false})));
        let local = Arc::new(
            MemoryLocalStorage::new().with_item(LEGACY_STATE_KEY, r#"{"token":"legacy"}"#),
        );
        let state = StateStore::new(p.correlator.clone(), local).load().await.unwrap();
        assert_eq!(state.token.as_deref(), Some("canonical"));
        assert_eq!(state.receive_all, Some(false));
    }

    #[tokio::test]
    async fn empty_canonical_falls_back_to_legacy() {
        let p = page(Some(json!({})));
        let local = Arc::new(
            MemoryLocalStorage::new().with_item(LEGACY_STATE_KEY, r#"{"token":"abc"}"#),
        );
        let state = StateStore::new(p.correlator.clone(), local).load().await.unwrap();
        assert_eq!(
            state.to_value().unwrap(),
            json!({"token": "abc", "receiveAll": true})
        );
    }

    #[tokio::test]
    async fn both_empty_yields_defaults_only() {
        let p = page(Some(json!({})));
        let state = StateStore::new(p.correlator.clone(), Arc::new(MemoryLocalStorage::new()))
            .load()
            .await
            .unwrap();
        assert_eq!(state.to_value().unwrap(), json!({"receiveAll": true}));
    }

    #[tokio::test]
    async fn unreadable_legacy_is_ignored() {
        let p = page(Some(json!({})));
        let local = Arc::new(MemoryLocalStorage::new().with_item(LEGACY_STATE_KEY, "{oops"));
        let state = StateStore::new(p.correlator.clone(), local).load().await.unwrap();
        assert_eq!(state.into_inner().to_value().unwrap(), json!({"receiveAll": true}));
    }

    #[tokio::test]
    async fn unknown_keys_survive_load() {
        let p = page(Some(json!({"token": "t", "futureFlag": 3})));
        let state = StateStore::new(p.correlator.clone(), Arc::new(MemoryLocalStorage::new()))
            .load()
            .await
            .unwrap();
        assert_eq!(state.extra.get("futureFlag"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn malformed_field_keeps_canonical_record() {
        let p = page(Some(json!({"token": "abc", "userEmail": "a@b.c", "onboarding": -1})));
        let local = Arc::new(
            MemoryLocalStorage::new().with_item(LEGACY_STATE_KEY, r#"{"token":"legacy"}"#),
        );
        let state = StateStore::new(p.correlator.clone(), local).load().await.unwrap();
        assert_eq!(state.token.as_deref(), Some("abc"));
        assert_eq!(state.user_email.as_deref(), Some("a@b.c"));
        assert_eq!(
            state.to_value().unwrap(),
            json!({"token": "abc", "userEmail": "a@b.c", "onboarding": -1, "receiveAll": true})
        );
    }

    #[tokio::test]
    async fn null_valued_canonical_record_is_not_empty() {
        let p = page(Some(json!({"token": null})));
        let local = Arc::new(
            MemoryLocalStorage::new().with_item(LEGACY_STATE_KEY, r#"{"token":"stale"}"#),
        );
        let state = StateStore::new(p.correlator.clone(), local).load().await.unwrap();
        assert_eq!(state.token, None);
        assert_eq!(
            state.to_value().unwrap(),
            json!({"token": null, "receiveAll": true})
        );
    }

    #[tokio::test]
    async fn load_without_reply_is_unavailable() {
        let p = page(None);
        let err = StateStore::new(p.correlator.clone(), Arc::new(MemoryLocalStorage::new()))
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, StateError::Unavailable("timed out")));
    }

    #[tokio::test]
    async fn save_mirrors_then_sends_set_state() {
        let mut p = page(Some(json!({})));
        let local = Arc::new(MemoryLocalStorage::new());
        let mut state = StateStore::new(p.correlator.clone(), local.clone())
            .load()
            .await
            .unwrap();

        state.token = Some("xyz".into());
        state.pane_visible = Some(true);
        state.save().unwrap();

        let mirrored: Value =
            serde_json::from_str(&local.get_item(LEGACY_STATE_KEY).unwrap()).unwrap();
        assert_eq!(
            mirrored,
            json!({"token": "xyz", "paneVisible": true, "receiveAll": true})
        );

        let sent = p.sent.recv().await.unwrap();
        assert_eq!(sent.action, SET_STATE);
        assert_eq!(sent.field("state"), Some(&mirrored));
        assert!(sent.field("save").is_none());
        assert_eq!(p.doc.listener_count(RECEIVE_BACKGROUND_MESSAGE), 0);
    }

    #[tokio::test]
    async fn mirror_failure_is_reported_and_nothing_is_sent() {
        let mut p = page(Some(json!({})));
        let local = Arc::new(MemoryLocalStorage::new());
        let state = StateStore::new(p.correlator.clone(), local.clone())
            .load()
            .await
            .unwrap();

        local.exhaust_quota(true);
        let err = state.save().unwrap_err();
        assert!(matches!(
            err,
            StateError::LegacyWrite(PlatformError::QuotaExceeded { .. })
        ));
        let none = tokio::time::timeout(Duration::from_millis(30), p.sent.recv()).await;
        assert!(none.is_err());
    }

    #[tokio::test]
    async fn custom_legacy_key() {
        let p = page(Some(json!({})));
        let local = Arc::new(MemoryLocalStorage::new().with_item("old", r#"{"disabled":true}"#));
        let config = RelayConfig {
            legacy_state_key: "old".into(),
            ..RelayConfig::default()
        };
        let state = StateStore::from_config(p.correlator.clone(), local, &config)
            .load()
            .await
            .unwrap();
        assert_eq!(state.disabled, Some(true));
    }
}
