//! vtguard - safety layer for destructive file operations
//!
//! Thin binary entry point that loads configuration, installs tracing and
//! delegates to the command handlers in `cli`.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod cli;
mod main_helpers;

use cli::Cli;
use main_helpers::{initialize_tracing, load_config};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let manager = load_config(args.config.as_deref(), args.workspace.as_deref())?;
    initialize_tracing(manager.config())?;
    debug!(
        config_path = ?manager.config_path(),
        workspace = ?manager.workspace_root(),
        layers = manager.layer_stack().layers().len(),
        "Configuration loaded"
    );

    cli::run(args, manager.into_config()).await
}
