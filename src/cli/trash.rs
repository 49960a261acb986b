use anyhow::{Context, Result};
use clap::Subcommand;
use vtguard_core::confirmation::format_bytes;
use vtguard_core::{CleanupReport, SafetySession, TrashEntry};

use super::{Output, confirm_irreversible};

#[derive(Debug, Clone, Subcommand)]
pub enum TrashCommands {
    /// List entries in the private trash, newest first
    List,

    /// Move an entry back to its original location
    Restore {
        /// Trash entry id
        id: String,
    },

    /// Permanently delete one entry
    Purge {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Permanently delete every entry
    Empty {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Remove entries older than the retention period
    Clean {
        /// Override `trash.retention_days`
        #[arg(long)]
        days: Option<u64>,
    },
}

pub(crate) async fn handle_trash_command(
    session: &SafetySession,
    command: TrashCommands,
    output: Output,
) -> Result<()> {
    match command {
        TrashCommands::List => {
            let entries = session.trash().lock().await.list();
            if output.json {
                return output.json(&entries);
            }
            print_entries(&entries);
            Ok(())
        }
        TrashCommands::Restore { id } => {
            let restored = session
                .trash()
                .lock()
                .await
                .restore_from_trash(&id)
                .with_context(|| format!("Failed to restore trash entry {id}"))?;
            if output.json {
                return output.json(&serde_json::json!({ "id": id, "restored_to": restored }));
            }
            println!("Restored {id} to {}", restored.display());
            Ok(())
        }
        TrashCommands::Purge { id, yes } => {
            let question = format!("Permanently delete trash entry {id}?");
            if !confirm_irreversible(session, yes, &question).await? {
                println!("Cancelled");
                return Ok(());
            }
            session
                .trash()
                .lock()
                .await
                .permanent_delete(&id)
                .with_context(|| format!("Failed to purge trash entry {id}"))?;
            if output.json {
                return output.json(&serde_json::json!({ "id": id, "purged": true }));
            }
            println!("Purged {id}");
            Ok(())
        }
        TrashCommands::Empty { yes } => {
            let count = session.trash().lock().await.len();
            if count == 0 {
                return finish_cleanup(output, "Trash is already empty", &CleanupReport::default());
            }
            let question = format!("Permanently delete {count} trash entr(ies)?");
            if !confirm_irreversible(session, yes, &question).await? {
                println!("Cancelled");
                return Ok(());
            }
            let report = session.trash().lock().await.empty_trash()?;
            finish_cleanup(output, "Emptied the trash", &report)
        }
        TrashCommands::Clean { days } => {
            let days = days.unwrap_or(session.config().trash.retention_days);
            let report = session.trash().lock().await.clean_old_trash_items(days)?;
            finish_cleanup(output, &format!("Removed entries older than {days} day(s)"), &report)
        }
    }
}

fn print_entries(entries: &[TrashEntry]) {
    if entries.is_empty() {
        println!("Trash is empty");
        return;
    }
    for entry in entries {
        println!(
            "{}  {}  {:>10}  {}",
            entry.id,
            entry.trashed_at.format("%Y-%m-%d %H:%M:%S"),
            format_bytes(entry.size),
            entry.original_path.display()
        );
    }
}

/// Shared output for batch removals in `trash` and `backup`.
pub(super) fn finish_cleanup(output: Output, summary: &str, report: &CleanupReport) -> Result<()> {
    if output.json {
        return output.json(report);
    }
    println!("{summary}: {} removed, {} failed", report.removed, report.failed);
    for error in &report.errors {
        println!("  {error}");
    }
    Ok(())
}
