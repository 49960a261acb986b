use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;
use vtguard_commons::absolutize;
use vtguard_core::{FileOperation, OperationPreview, PermissionInfo, PolicyDecision, SafetySession};

use super::Output;

#[derive(Debug, Serialize)]
struct PathCheck {
    path: PathBuf,
    decision: PolicyDecision,
    permissions: PermissionInfo,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    operation: FileOperation,
    paths: Vec<PathCheck>,
    preview: OperationPreview,
}

pub(crate) async fn handle_check_command(
    session: &SafetySession,
    operation: FileOperation,
    paths: &[PathBuf],
    output: Output,
) -> Result<()> {
    let paths: Vec<PathBuf> = paths.iter().map(|path| absolutize(path)).collect();
    let mut checks = Vec::with_capacity(paths.len());
    for path in &paths {
        checks.push(PathCheck {
            path: path.clone(),
            decision: session.policy().classify(operation, path),
            permissions: session.permissions().check_permissions(path, operation).await,
        });
    }
    let report = CheckReport {
        operation,
        paths: checks,
        preview: session.confirmation().build_preview(operation, &paths),
    };

    if output.json {
        return output.json(&report);
    }

    for check in &report.paths {
        println!("{} ({operation})", check.path.display());
        println!("  policy: {}", describe_decision(&check.decision));
        println!("  access: {}", describe_access(&check.permissions));
    }
    println!();
    print!("{}", report.preview.render(output.color()));
    Ok(())
}

fn describe_decision(decision: &PolicyDecision) -> String {
    let mut flags = vec![if decision.allowed { "allowed" } else { "blocked" }];
    if decision.needs_confirmation {
        flags.push("needs confirmation");
    }
    if decision.needs_elevation {
        flags.push("needs elevation");
    }
    match &decision.reason {
        Some(reason) => format!("{} ({reason})", flags.join(", ")),
        None => flags.join(", "),
    }
}

fn describe_access(info: &PermissionInfo) -> String {
    if !info.exists {
        return "missing".to_string();
    }
    let mut access = String::with_capacity(3);
    access.push(if info.readable { 'r' } else { '-' });
    access.push(if info.writable { 'w' } else { '-' });
    access.push(if info.executable { 'x' } else { '-' });
    let mut line = access;
    if let Some(mode) = info.mode {
        line.push_str(&format!(" mode {mode:04o}"));
    }
    if let Some(owner) = info.owner {
        line.push_str(&format!(" owner {owner}"));
    }
    if info.needs_elevation {
        line.push_str(" (elevation required)");
    }
    line
}
