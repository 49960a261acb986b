use std::path::Path;

use anyhow::{Context, Result};
use vtguard_config::{ConfigManager, SafetyConfig};

/// Install the stderr subscriber. `RUST_LOG` takes precedence over
/// `logging.level`; stdout stays reserved for command output.
pub(crate) fn initialize_tracing(config: &SafetyConfig) -> Result<()> {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.trim()));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let init_result = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();

    if let Err(err) = init_result {
        tracing::warn!(error = %err, "tracing already initialized; skipping setup");
    }
    Ok(())
}

/// Resolve configuration from `--config`, then `--workspace`, then the
/// environment and current directory.
pub(crate) fn load_config(
    config_file: Option<&Path>,
    workspace: Option<&Path>,
) -> Result<ConfigManager> {
    match (config_file, workspace) {
        (Some(file), _) => ConfigManager::load_from_file(file)
            .with_context(|| format!("Failed to load {}", file.display())),
        (None, Some(workspace)) => ConfigManager::load_from_workspace(workspace)
            .with_context(|| format!("Failed to load workspace config in {}", workspace.display())),
        (None, None) => ConfigManager::load(),
    }
}
