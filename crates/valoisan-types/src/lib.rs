//! # valoisan-types
//!
//! Core type definitions for the valoisan webmail extension relay.
//!
//! This crate is the foundation of the dependency graph -- all other
//! valoisan crates depend on it. It contains:
//!
//! - **[`envelope`]** -- the `{action, ...fields}` wire envelope
//! - **[`request`]** -- the closed set of background requests
//! - **[`state`]** -- the persisted user preference record
//! - **[`manifest`]** -- extension manifest and install lifecycle details
//! - **[`config`]** -- relay configuration schema
//! - **[`error`]** -- [`RelayError`] error type

pub mod config;
pub mod envelope;
pub mod error;
pub mod manifest;
pub mod request;
pub mod state;

pub use envelope::Envelope;
pub use error::{RelayError, Result};
pub use request::Request;
pub use state::PreferenceState;
