//! `valo manifest` -- print the manifest as `getManifest` returns it.
//!
//! Reads `--manifest`, then the config's `manifest_path`, then
//! `./manifest.json`. With none of those present a minimal manifest
//! named after this build is printed.

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::debug;
use valoisan_types::config::RelayConfig;
use valoisan_types::manifest::ExtensionManifest;

/// Arguments for the `valo manifest` subcommand.
#[derive(Args)]
pub struct ManifestArgs {
    /// Path to `manifest.json`.
    #[arg(long)]
    pub manifest: Option<PathBuf>,
}

/// Locate and parse the manifest. An explicitly named file must exist.
pub async fn load_manifest(
    manifest_override: Option<&Path>,
    config: &RelayConfig,
) -> anyhow::Result<ExtensionManifest> {
    let explicit = manifest_override
        .map(Path::to_path_buf)
        .or_else(|| config.manifest_path.clone());

    let path = match explicit {
        Some(path) => path,
        None => {
            let local = PathBuf::from("manifest.json");
            if !local.exists() {
                debug!("no manifest.json found, using built-in manifest");
                return Ok(ExtensionManifest::new("valoisan", env!("CARGO_PKG_VERSION")));
            }
            local
        }
    };

    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    ExtensionManifest::from_json(&text)
        .map_err(|e| anyhow::anyhow!("invalid manifest {}: {e}", path.display()))
}

pub async fn run(args: ManifestArgs, config: &RelayConfig) -> anyhow::Result<()> {
    let manifest = load_manifest(args.manifest.as_deref(), config).await?;
    println!("{}", serde_json::to_string_pretty(&manifest.to_value()?)?);
    Ok(())
}
