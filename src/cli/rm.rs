use std::path::PathBuf;

use anyhow::{Result, bail};
use vtguard_core::{DeleteOptions, DeleteReport, SafetySession};

use super::Output;

pub(crate) async fn handle_rm_command(
    session: &SafetySession,
    paths: &[PathBuf],
    backup: bool,
    output: Output,
) -> Result<()> {
    let options = DeleteOptions {
        backup,
        ..DeleteOptions::default()
    };
    let report = session.guarded_delete(paths, &options).await;

    if output.json {
        output.json(&report)?;
    } else {
        print_report(&report);
    }

    if !report.confirmation.confirmed {
        bail!("nothing deleted: {}", decline_reason(&report));
    }
    if report.failed() > 0 {
        bail!("{} of {} path(s) could not be deleted", report.failed(), report.items.len());
    }
    Ok(())
}

fn decline_reason(report: &DeleteReport) -> &str {
    report.confirmation.reason.as_deref().unwrap_or("declined")
}

fn print_report(report: &DeleteReport) {
    if !report.confirmation.confirmed {
        if let Some(preview) = &report.confirmation.preview {
            print!("{}", preview.render(false));
        }
        println!("Not deleted: {}", decline_reason(report));
        return;
    }

    for item in &report.items {
        let path = item.path.display();
        match (&item.error, &item.trash_id) {
            (Some(error), _) => println!("kept     {path}: {error}"),
            (None, Some(id)) => println!("trashed  {path} (restore with `vtguard trash restore {id}`)"),
            (None, None) => println!("trashed  {path} (desktop trash)"),
        }
        if let Some(backup_id) = &item.backup_id {
            println!("         backup {backup_id}");
        }
    }
}
