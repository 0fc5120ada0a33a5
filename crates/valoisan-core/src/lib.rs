//! Cross-context message relay and preference-state synchronization.
//!
//! # Architecture
//!
//! ```text
//! page script                     content script               background
//! ───────────                     ──────────────               ──────────
//! Correlator ──► PageBridge ──(extensionSendBackgroundMessage)──► BootListener
//!                                                                  │ runtime.sendMessage
//!                                                                  ▼
//!                                                           BackgroundRouter
//!                                                                  │ tabs.sendMessage
//!                                                                  ▼
//! Correlator ◄──(extensionReceiveBackgroundMessage)────────── BootListener
//! ```
//!
//! - [`bridge`] -- [`PageBridge`](bridge::PageBridge) and the privileged
//!   [`BootListener`](bridge::BootListener).
//! - [`correlator`] -- request/response on top of one-way events.
//! - [`router`] -- background dispatch on the request action.
//! - [`install`] -- install/upgrade lifecycle hook.
//! - [`state`] -- preference record load/save with the legacy mirror.
//! - [`dom`] -- bounded polling for selectors and XPath expressions.
//! - [`boot`] -- which pages get the extension injected.
//! - [`logging`] -- log filter resolution from the extension's flags.
//! - [`bootstrap`] -- wiring of the content and background contexts.

pub mod boot;
pub mod bootstrap;
pub mod bridge;
pub mod correlator;
pub mod dom;
pub mod install;
pub mod logging;
pub mod router;
pub mod state;

pub use bridge::{BootListener, PageBridge};
pub use correlator::{CallOutcome, Correlator};
pub use router::{BackgroundRouter, Dispatch};
pub use state::{SessionState, StateError, StateStore};
