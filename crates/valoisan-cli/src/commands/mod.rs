//! CLI command implementations for `valo`.
//!
//! - [`state`] -- Canonical preference record in the native file store.
//! - [`manifest`] -- Manifest lookup and printing.
//! - [`simulate`] -- In-process page + background session.

pub mod manifest;
pub mod simulate;
pub mod state;

use std::path::{Path, PathBuf};

use valoisan_platform::env::NativeEnvironment;
use valoisan_platform::storage::NativeExtensionStorage;
use valoisan_types::config::RelayConfig;

/// Load configuration from the given path override or via auto-discovery.
///
/// Discovery order:
/// 1. `VALOISAN_CONFIG` env var
/// 2. `~/.valoisan/config.json`
///
/// Returns a default `RelayConfig` if no config file is found.
pub async fn load_config(config_override: Option<&Path>) -> anyhow::Result<RelayConfig> {
    if let Some(path) = config_override
        && !path.exists()
    {
        anyhow::bail!("config file not found: {}", path.display());
    }
    let config =
        valoisan_platform::config_loader::load_config(&NativeEnvironment, dirs::home_dir(), config_override)
            .await?;
    Ok(config)
}

/// Where the canonical store lives: the flag, then the config, then the
/// platform data dir.
pub fn resolve_store_path(
    store_override: Option<&Path>,
    config: &RelayConfig,
) -> anyhow::Result<PathBuf> {
    if let Some(path) = store_override {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = &config.store_path {
        return Ok(path.clone());
    }
    NativeExtensionStorage::default_path()
        .ok_or_else(|| anyhow::anyhow!("no data directory on this platform; pass --store"))
}
