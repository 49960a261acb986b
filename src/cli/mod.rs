//! Command-line surface over [`SafetySession`].

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use vtguard_commons::TokioProcessRunner;
use vtguard_config::SafetyConfig;
use vtguard_core::{
    DialoguerPrompter, EnvironmentCapabilities, FileOperation, SafetySession, confirm,
};

mod backup;
mod check;
mod rm;
mod trash;

use backup::BackupCommands;
use trash::TrashCommands;

#[derive(Debug, Parser)]
#[command(name = "vtguard")]
#[command(about = "Guard destructive file operations with trash, backups and confirmations")]
#[command(version)]
pub struct Cli {
    /// Load configuration from this file instead of the workspace
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Workspace whose `.vtguard/vtguard.toml` or `vtguard.toml` is used
    #[arg(long, global = true, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Show the policy decision, risk and effective access for paths
    Check {
        /// Operation name (read, write, delete, move, chmod, ...)
        operation: FileOperation,

        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Confirm, then move paths to the trash
    Rm {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Back up every path before trashing it
        #[arg(long)]
        backup: bool,
    },

    /// Inspect and manage the trash
    Trash {
        #[command(subcommand)]
        command: TrashCommands,
    },

    /// Create, inspect and restore backups
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
}

/// Build a session from `config` and run the selected command.
pub async fn run(cli: Cli, config: SafetyConfig) -> Result<()> {
    let environment = EnvironmentCapabilities::detect();
    let session = SafetySession::initialize(
        config,
        environment,
        Arc::new(DialoguerPrompter::new()),
        Arc::new(TokioProcessRunner),
    )?;
    let output = Output { json: cli.json };

    let result = match cli.command {
        Commands::Check { operation, paths } => {
            check::handle_check_command(&session, operation, &paths, output).await
        }
        Commands::Rm { paths, backup } => {
            rm::handle_rm_command(&session, &paths, backup, output).await
        }
        Commands::Trash { command } => trash::handle_trash_command(&session, command, output).await,
        Commands::Backup { command } => {
            backup::handle_backup_command(&session, command, output).await
        }
    };

    session.shutdown().await?;
    result
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Output {
    pub json: bool,
}

impl Output {
    pub(crate) fn json<T: Serialize>(self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Colour only when stdout is a terminal and text output was requested.
    pub(crate) fn color(self) -> bool {
        !self.json && std::io::stdout().is_terminal()
    }
}

/// Ask before an irreversible command unless `--yes` was given.
pub(crate) async fn confirm_irreversible(
    session: &SafetySession,
    yes: bool,
    question: &str,
) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    if !session.environment().interactive_session {
        bail!("refusing to continue without --yes in a non-interactive session");
    }
    let timeout = session.config().confirmation.prompt_timeout();
    Ok(confirm(session.prompter().as_ref(), question, timeout).await)
}
