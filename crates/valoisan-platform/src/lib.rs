//! Browser platform abstraction layer for valoisan.
//!
//! The relay only ever touches the browser through a handful of
//! primitives. Each one is a trait here so the protocol code is
//! platform-agnostic and testable natively:
//!
//! - [`events::PageEvents`] -- the document's custom-event target
//! - [`messaging::ContentMessaging`] -- `runtime.sendMessage` /
//!   `runtime.onMessage` as seen from a content script
//! - [`messaging::BackgroundMessaging`] -- `runtime.onMessage`,
//!   `tabs.sendMessage`, `tabs.create` and `runtime.getManifest` as seen
//!   from the background context
//! - [`storage::ExtensionStorage`] -- `storage.local` (async, canonical)
//! - [`storage::LocalStorage`] -- page `localStorage` (sync, legacy mirror)
//! - [`dom::DomQuery`] -- selector and XPath lookups
//! - [`env::Environment`] -- environment variables
//!
//! # Implementations
//!
//! The [`browser`] module provides in-process implementations of every
//! trait: a [`BrowserRuntime`](browser::BrowserRuntime) that wires content
//! scripts in tabs to a background context over tokio channels, an
//! in-memory document and in-memory storage areas.
//!
//! With the `native` feature, [`storage::NativeExtensionStorage`] keeps the
//! canonical storage area in a JSON file on disk.

pub mod browser;
pub mod config_loader;
pub mod dom;
pub mod env;
pub mod error;
pub mod events;
pub mod messaging;
pub mod storage;

pub use error::PlatformError;
