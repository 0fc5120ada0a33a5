//! `valo simulate` -- run one page session against an in-process background.
//!
//! Seeds the canonical store and the page's legacy mirror, boots a page,
//! loads state through the full relay and prints the resolved record.
//! Useful for checking migration behavior without a browser.
//!
//! # Examples
//!
//! ```text
//! valo simulate --legacy '{"token":"abc"}'
//! valo simulate --canonical '{"token":"new"}' --legacy '{"token":"old"}'
//! ```

use std::sync::Arc;

use clap::Args;
use serde_json::Value;
use tracing::info;
use valoisan_core::bootstrap::{BackgroundContext, ContentContext};
use valoisan_platform::browser::{
    BrowserRuntime, MemoryDocument, MemoryExtensionStorage, MemoryLocalStorage,
};
use valoisan_platform::storage::ExtensionStorage;
use valoisan_types::config::RelayConfig;
use valoisan_types::state::PreferenceState;

use super::manifest::load_manifest;

const SIMULATED_PAGE: &str = "https://mail.google.com/mail/u/0/#inbox";

/// Arguments for the `valo simulate` subcommand.
#[derive(Args)]
pub struct SimulateArgs {
    /// Legacy mirror contents (raw `localStorage` string).
    #[arg(long)]
    pub legacy: Option<String>,

    /// Canonical record, as JSON.
    #[arg(long)]
    pub canonical: Option<String>,

    /// Page URL to boot (controls view gating).
    #[arg(long, default_value = SIMULATED_PAGE)]
    pub url: String,
}

/// Run the session and return the loaded record.
pub async fn simulate(args: &SimulateArgs, config: &RelayConfig) -> anyhow::Result<PreferenceState> {
    let storage = Arc::new(MemoryExtensionStorage::new());
    if let Some(canonical) = &args.canonical {
        let value: Value = serde_json::from_str(canonical)
            .map_err(|e| anyhow::anyhow!("--canonical is not valid JSON: {e}"))?;
        storage.set(&config.canonical_state_key, value).await?;
    }

    let mut local = MemoryLocalStorage::new();
    if let Some(legacy) = &args.legacy {
        local = local.with_item(&config.legacy_state_key, legacy);
    }

    let runtime = BrowserRuntime::new(load_manifest(None, config).await?);
    let background = BackgroundContext::new(config, storage, Arc::new(runtime.background()));
    background.start();

    let Some(page) = ContentContext::boot(
        config,
        &args.url,
        Arc::new(MemoryDocument::new()),
        Arc::new(runtime.open_tab(&args.url)),
        Arc::new(local),
    ) else {
        background.stop().await;
        anyhow::bail!("the extension does not run on {}", args.url);
    };

    let loaded = page.load_state().await;
    page.shutdown().await;
    background.stop().await;

    let state = loaded?.into_inner();
    info!(state = ?state, "simulated load complete");
    Ok(state)
}

pub async fn run(args: SimulateArgs, config: &RelayConfig) -> anyhow::Result<()> {
    let state = simulate(&args, config).await?;
    println!("{}", serde_json::to_string_pretty(&state.to_value()?)?);
    Ok(())
}
