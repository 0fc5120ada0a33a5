//! `valo` -- CLI binary for the valoisan extension relay.
//!
//! Provides the following subcommands:
//!
//! - `valo state` -- Show, overwrite or clear the canonical preference record.
//! - `valo manifest` -- Print the extension manifest as `getManifest` returns it.
//! - `valo simulate` -- Run a page session against an in-process background.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use valoisan_platform::env::NativeEnvironment;

mod commands;

#[derive(Parser)]
#[command(name = "valo", about = "valoisan extension relay CLI", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or edit the canonical preference record.
    State {
        #[command(subcommand)]
        action: StateCmd,
    },

    /// Print the extension manifest.
    Manifest(commands::manifest::ManifestArgs),

    /// Load state through the full relay, in-process.
    Simulate(commands::simulate::SimulateArgs),
}

#[derive(Subcommand)]
enum StateCmd {
    /// Print the stored record.
    Show {
        /// Storage file (defaults to the config's store path).
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Overwrite the stored record with a JSON object.
    Set {
        /// The new record, as JSON.
        json: String,

        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Remove the stored record.
    Clear {
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env = NativeEnvironment;
    let default_filter = valoisan_core::logging::default_filter(&env, cli.verbose);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
    tracing::debug!(release = %valoisan_core::logging::release_label(&env), "starting valo");

    let config = commands::load_config(cli.config.as_deref()).await?;

    match cli.command {
        Commands::State { action } => match action {
            StateCmd::Show { store } => {
                commands::state::state_show(&config, store.as_deref()).await?;
            }
            StateCmd::Set { json, store } => {
                commands::state::state_set(&config, store.as_deref(), &json).await?;
            }
            StateCmd::Clear { store } => {
                commands::state::state_clear(&config, store.as_deref()).await?;
            }
        },
        Commands::Manifest(args) => commands::manifest::run(args, &config).await?,
        Commands::Simulate(args) => commands::simulate::run(args, &config).await?,
    }

    Ok(())
}
