use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use vtguard_commons::absolutize;
use vtguard_core::confirmation::format_bytes;
use vtguard_core::{BackupOptions, BackupOutcome, BackupRecord, RestoreOptions, SafetySession};

use super::Output;
use super::trash::finish_cleanup;

#[derive(Debug, Clone, Subcommand)]
pub enum BackupCommands {
    /// Back up a file or directory now, even when automatic backups are off
    Create {
        path: PathBuf,

        /// Free-form label stored with the record
        #[arg(long, default_value = "manual")]
        label: String,

        /// Gzip the copy regardless of `backup.compress`
        #[arg(long)]
        compress: bool,
    },

    /// List backups, newest first
    List {
        /// Only show backups of this path
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Restore a backup to its original location or `--target`
    Restore {
        id: String,

        #[arg(long, value_name = "PATH")]
        target: Option<PathBuf>,

        /// Replace whatever is at the destination
        #[arg(long)]
        overwrite: bool,

        /// Skip the checksum comparison before restoring
        #[arg(long)]
        no_verify: bool,
    },

    /// Recompute a backup's checksum and compare it with the record
    Verify { id: String },

    /// Remove backups older than the retention period
    Clean {
        /// Override `backup.retention_days`
        #[arg(long)]
        days: Option<u64>,
    },

    /// Show disk space used by the backup directory
    Usage,
}

pub(crate) async fn handle_backup_command(
    session: &SafetySession,
    command: BackupCommands,
    output: Output,
) -> Result<()> {
    let mut backups = session.backups().lock().await;
    match command {
        BackupCommands::Create {
            path,
            label,
            compress,
        } => {
            let options = BackupOptions {
                force: true,
                compress: compress.then_some(true),
            };
            let outcome = backups
                .create_backup(&path, &label, options)
                .with_context(|| format!("Failed to back up {}", path.display()))?;
            let record = match &outcome {
                BackupOutcome::Created { record } => record,
                BackupOutcome::TooLarge { size, limit } => bail!(
                    "{} is {} which exceeds the {} backup limit",
                    path.display(),
                    format_bytes(*size),
                    format_bytes(*limit)
                ),
                BackupOutcome::Skipped => bail!("backup of {} was skipped", path.display()),
            };
            if output.json {
                return output.json(record);
            }
            println!("Created backup {} of {}", record.id, record.original_path.display());
            Ok(())
        }
        BackupCommands::List { path } => {
            let records = match path {
                Some(path) => backups.backups_for(&absolutize(&path)),
                None => backups.list(),
            };
            if output.json {
                return output.json(&records);
            }
            print_records(&records);
            Ok(())
        }
        BackupCommands::Restore {
            id,
            target,
            overwrite,
            no_verify,
        } => {
            let options = RestoreOptions {
                target,
                overwrite,
                verify_checksum: !no_verify,
            };
            let restored = backups
                .restore_backup(&id, &options)
                .with_context(|| format!("Failed to restore backup {id}"))?;
            if output.json {
                return output.json(&serde_json::json!({ "id": id, "restored_to": restored }));
            }
            println!("Restored {id} to {}", restored.display());
            Ok(())
        }
        BackupCommands::Verify { id } => {
            backups.verify_backup(&id)?;
            if output.json {
                return output.json(&serde_json::json!({ "id": id, "verified": true }));
            }
            println!("Backup {id} matches its checksum");
            Ok(())
        }
        BackupCommands::Clean { days } => {
            let days = days.unwrap_or(session.config().backup.retention_days);
            let report = backups.cleanup_old_backups(days)?;
            finish_cleanup(output, &format!("Removed backups older than {days} day(s)"), &report)
        }
        BackupCommands::Usage => {
            let usage = backups.disk_usage();
            if output.json {
                return output.json(&usage);
            }
            println!(
                "{} in {} file(s) across {} backup(s) at {}",
                format_bytes(usage.total_bytes),
                usage.file_count,
                usage.backup_count,
                backups.directory().display()
            );
            Ok(())
        }
    }
}

fn print_records(records: &[BackupRecord]) {
    if records.is_empty() {
        println!("No backups");
        return;
    }
    for record in records {
        println!(
            "{}  {}  {:>10}  {:<9}  {}{}",
            record.id,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            format_bytes(record.size),
            record.operation_label,
            record.original_path.display(),
            if record.compressed { "  (gz)" } else { "" }
        );
    }
}
