//! In-process browser implementation.
//!
//! Provides implementations of every platform trait that run inside a
//! single tokio runtime:
//!
//! - [`BrowserRuntime`] -- wires content scripts in tabs ([`TabPort`]) to a
//!   background context ([`BackgroundPort`]) over unbounded channels.
//! - [`MemoryDocument`] -- a document with a custom-event target and a
//!   mutable set of elements for DOM lookups.
//! - [`MemoryExtensionStorage`] / [`MemoryLocalStorage`] -- storage areas
//!   with failure injection.
//! - [`MemoryEnvironment`] -- a fixed set of environment variables.
//!
//! Nothing here persists beyond the lifetime of the values.

pub mod document;
pub mod env;
pub mod runtime;
pub mod storage;

pub use document::MemoryDocument;
pub use env::MemoryEnvironment;
pub use runtime::{BackgroundPort, BrowserRuntime, TabPort};
pub use storage::{MemoryExtensionStorage, MemoryLocalStorage};
