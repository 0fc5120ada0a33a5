//! In-process extension runtime.
//!
//! One [`BrowserRuntime`] stands in for the browser's extension messaging
//! system: content scripts attach as [`TabPort`]s, the background context
//! attaches as a [`BackgroundPort`], and messages flow over unbounded
//! tokio channels.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;
use valoisan_types::manifest::ExtensionManifest;

use crate::error::PlatformError;
use crate::messaging::{
    BackgroundMessaging, ContentMessaging, MessageSender, RuntimeMessage, TabId,
};

struct RuntimeInner {
    manifest: ExtensionManifest,
    background_tx: mpsc::UnboundedSender<RuntimeMessage>,
    background_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<RuntimeMessage>>,
    tabs: Mutex<HashMap<TabId, mpsc::UnboundedSender<Value>>>,
    created: Mutex<Vec<(TabId, String)>>,
    next_tab: AtomicU32,
}

impl RuntimeInner {
    fn allocate_tab(&self) -> TabId {
        self.next_tab.fetch_add(1, Ordering::Relaxed)
    }
}

/// The shared messaging fabric for one extension.
#[derive(Clone)]
pub struct BrowserRuntime {
    inner: Arc<RuntimeInner>,
}

impl BrowserRuntime {
    pub fn new(manifest: ExtensionManifest) -> Self {
        let (background_tx, background_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(RuntimeInner {
                manifest,
                background_tx,
                background_rx: tokio::sync::Mutex::new(background_rx),
                tabs: Mutex::new(HashMap::new()),
                created: Mutex::new(Vec::new()),
                next_tab: AtomicU32::new(1),
            }),
        }
    }

    /// Load a page in a new tab and attach a content script to it.
    pub fn open_tab(&self, url: &str) -> TabPort {
        let tab_id = self.inner.allocate_tab();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .tabs
            .lock()
            .expect("BrowserRuntime mutex poisoned")
            .insert(tab_id, tx);
        debug!(tab_id, url, "content script attached");
        TabPort {
            tab_id,
            url: url.to_owned(),
            inner: Arc::clone(&self.inner),
            inbox: tokio::sync::Mutex::new(rx),
        }
    }

    /// The background context's endpoint.
    pub fn background(&self) -> BackgroundPort {
        BackgroundPort {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Send a message from an extension page (popup, options page).
    ///
    /// Such senders have no tab, so the background cannot reply.
    pub fn send_from_extension_page(&self, payload: Value) -> Result<(), PlatformError> {
        self.inner
            .background_tx
            .send(RuntimeMessage {
                payload,
                sender: MessageSender::default(),
            })
            .map_err(|_| PlatformError::ChannelClosed("background".into()))
    }

    /// URLs of tabs opened through `tabs.create`, oldest first.
    pub fn created_tabs(&self) -> Vec<String> {
        self.inner
            .created
            .lock()
            .expect("BrowserRuntime mutex poisoned")
            .iter()
            .map(|(_, url)| url.clone())
            .collect()
    }
}

/// A content script's endpoint, bound to one tab.
///
/// Dropping the port closes the tab: later `tabs.sendMessage` calls to it
/// fail with [`PlatformError::TabNotFound`].
pub struct TabPort {
    tab_id: TabId,
    url: String,
    inner: Arc<RuntimeInner>,
    inbox: tokio::sync::Mutex<mpsc::UnboundedReceiver<Value>>,
}

impl TabPort {
    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for TabPort {
    fn drop(&mut self) {
        if let Ok(mut tabs) = self.inner.tabs.lock() {
            tabs.remove(&self.tab_id);
        }
    }
}

#[async_trait]
impl ContentMessaging for TabPort {
    async fn send_message(&self, payload: Value) -> Result<(), PlatformError> {
        self.inner
            .background_tx
            .send(RuntimeMessage {
                payload,
                sender: MessageSender {
                    tab_id: Some(self.tab_id),
                    url: Some(self.url.clone()),
                },
            })
            .map_err(|_| PlatformError::ChannelClosed("background".into()))
    }

    async fn recv_message(&self) -> Option<Value> {
        self.inbox.lock().await.recv().await
    }
}

/// The background context's endpoint.
#[derive(Clone)]
pub struct BackgroundPort {
    inner: Arc<RuntimeInner>,
}

#[async_trait]
impl BackgroundMessaging for BackgroundPort {
    async fn recv_message(&self) -> Option<RuntimeMessage> {
        self.inner.background_rx.lock().await.recv().await
    }

    async fn send_to_tab(&self, tab: TabId, payload: Value) -> Result<(), PlatformError> {
        let tx = self
            .inner
            .tabs
            .lock()
            .expect("BrowserRuntime mutex poisoned")
            .get(&tab)
            .cloned()
            .ok_or(PlatformError::TabNotFound(tab))?;
        tx.send(payload).map_err(|_| PlatformError::TabNotFound(tab))
    }

    async fn create_tab(&self, url: &str) -> Result<TabId, PlatformError> {
        let tab_id = self.inner.allocate_tab();
        self.inner
            .created
            .lock()
            .expect("BrowserRuntime mutex poisoned")
            .push((tab_id, url.to_owned()));
        debug!(tab_id, url, "tab created");
        Ok(tab_id)
    }

    fn manifest(&self) -> &ExtensionManifest {
        &self.inner.manifest
    }
}
