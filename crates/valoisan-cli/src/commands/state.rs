//! `valo state` -- manage the canonical preference record.
//!
//! Operates on the native JSON file store, the same one a native host
//! running the background router reads and writes.
//!
//! # Examples
//!
//! ```text
//! valo state show
//! valo state set '{"token":"abc","receiveAll":false}'
//! valo state clear --store ./storage.json
//! ```

use std::path::Path;

use serde_json::Value;
use tracing::info;
use valoisan_platform::storage::{ExtensionStorage, NativeExtensionStorage};
use valoisan_types::config::RelayConfig;
use valoisan_types::state::PreferenceState;

use super::resolve_store_path;

fn open_store(store: Option<&Path>, config: &RelayConfig) -> anyhow::Result<NativeExtensionStorage> {
    Ok(NativeExtensionStorage::new(resolve_store_path(store, config)?))
}

/// Render a stored value the way `getState` would reply with it.
fn render(stored: Option<Value>) -> anyhow::Result<String> {
    let value = match stored {
        Some(value) if !value.is_null() => value,
        _ => Value::Object(Default::default()),
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Parse and validate a record given on the command line.
fn parse_record(json: &str) -> anyhow::Result<Value> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| anyhow::anyhow!("record is not valid JSON: {e}"))?;
    if !value.is_object() {
        anyhow::bail!("record must be a JSON object");
    }
    serde_json::from_value::<PreferenceState>(value.clone())
        .map_err(|e| anyhow::anyhow!("record does not match the preference schema: {e}"))?;
    Ok(value)
}

pub async fn state_show(config: &RelayConfig, store: Option<&Path>) -> anyhow::Result<()> {
    let storage = open_store(store, config)?;
    let stored = storage.get(&config.canonical_state_key).await?;
    println!("{}", render(stored)?);
    Ok(())
}

pub async fn state_set(config: &RelayConfig, store: Option<&Path>, json: &str) -> anyhow::Result<()> {
    let record = parse_record(json)?;
    let storage = open_store(store, config)?;
    storage.set(&config.canonical_state_key, record).await?;
    info!(path = %storage.path().display(), "state stored");
    println!("State written to {}", storage.path().display());
    Ok(())
}

pub async fn state_clear(config: &RelayConfig, store: Option<&Path>) -> anyhow::Result<()> {
    let storage = open_store(store, config)?;
    storage.remove(&config.canonical_state_key).await?;
    println!("State cleared in {}", storage.path().display());
    Ok(())
}
