//! Structured extension messaging.
//!
//! Content scripts and the background context exchange JSON values. A
//! content script sends to "the background" without addressing; the
//! background replies to a specific tab. Neither direction has
//! acknowledgements or ordering guarantees beyond a single sender.

use async_trait::async_trait;
use serde_json::Value;
use valoisan_types::manifest::ExtensionManifest;

use crate::error::PlatformError;

/// Browser tab identifier.
pub type TabId = u32;

/// Who sent a runtime message.
///
/// Messages from extension pages (popup, options) have no tab; only
/// messages from content scripts can be replied to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageSender {
    pub tab_id: Option<TabId>,
    pub url: Option<String>,
}

/// A message delivered to the background context.
#[derive(Debug, Clone)]
pub struct RuntimeMessage {
    pub payload: Value,
    pub sender: MessageSender,
}

/// Extension messaging as seen from a content script.
#[async_trait]
pub trait ContentMessaging: Send + Sync {
    /// `runtime.sendMessage`: deliver `payload` to the background context.
    async fn send_message(&self, payload: Value) -> Result<(), PlatformError>;

    /// `runtime.onMessage`: wait for the next message addressed to this tab.
    ///
    /// Returns `None` once the channel is closed.
    async fn recv_message(&self) -> Option<Value>;
}

/// Extension messaging and runtime APIs as seen from the background.
#[async_trait]
pub trait BackgroundMessaging: Send + Sync {
    /// `runtime.onMessage`: wait for the next message from any sender.
    ///
    /// Returns `None` once the channel is closed.
    async fn recv_message(&self) -> Option<RuntimeMessage>;

    /// `tabs.sendMessage`: deliver `payload` to the content script of `tab`.
    async fn send_to_tab(&self, tab: TabId, payload: Value) -> Result<(), PlatformError>;

    /// `tabs.create`: open a new tab at `url`.
    async fn create_tab(&self, url: &str) -> Result<TabId, PlatformError>;

    /// `runtime.getManifest`.
    fn manifest(&self) -> &ExtensionManifest;
}
