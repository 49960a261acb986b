use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Writes a config that keeps every store inside `root` and returns its path.
fn sandbox_config(root: &Path) -> Result<PathBuf> {
    let store = root.join("store");
    let config = format!(
        r#"
[history]
backup_directory = '{history}'

[trash]
use_native_trash = false
directory = '{trash}'

[backup]
directory = '{backups}'
"#,
        history = store.join("history").display(),
        trash = store.join("trash").display(),
        backups = store.join("backups").display(),
    );
    let path = root.join("vtguard.toml");
    fs::write(&path, config)?;
    Ok(path)
}

fn vtguard(root: &Path) -> Result<Command> {
    let config = sandbox_config(root)?;
    let mut cmd = Command::cargo_bin("vtguard")?;
    cmd.current_dir(root)
        .env("HOME", root)
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config);
    Ok(cmd)
}

#[test]
fn help_lists_commands() -> Result<()> {
    let mut cmd = Command::cargo_bin("vtguard")?;
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("trash"))
        .stdout(predicate::str::contains("backup"));
    Ok(())
}

#[test]
fn check_reports_policy_and_access() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let file = temp_dir.path().join("notes.txt");
    fs::write(&file, b"hello")?;

    vtguard(temp_dir.path())?
        .args(["check", "read"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("policy: allowed"))
        .stdout(predicate::str::contains("Operation: read"));
    Ok(())
}

#[test]
fn check_rejects_unknown_operation() -> Result<()> {
    let temp_dir = TempDir::new()?;
    vtguard(temp_dir.path())?
        .args(["check", "shred", "whatever"])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn rm_without_a_terminal_leaves_the_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let file = temp_dir.path().join("keep.txt");
    fs::write(&file, b"keep")?;

    vtguard(temp_dir.path())?
        .arg("rm")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing deleted"));

    assert!(file.exists(), "declined delete must not touch the file");
    Ok(())
}

#[test]
fn empty_trash_and_backup_listings() -> Result<()> {
    let temp_dir = TempDir::new()?;
    vtguard(temp_dir.path())?
        .args(["trash", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Trash is empty"));
    vtguard(temp_dir.path())?
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups"));
    vtguard(temp_dir.path())?
        .args(["trash", "empty"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already empty"));
    Ok(())
}

#[test]
fn backup_create_verify_and_restore() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let file = temp_dir.path().join("settings.json");
    fs::write(&file, br#"{"theme":"dark"}"#)?;

    let created = vtguard(temp_dir.path())?
        .args(["--json", "backup", "create", "--label", "smoke"])
        .arg(&file)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let record: serde_json::Value = serde_json::from_slice(&created)?;
    let id = record["id"].as_str().unwrap_or_default().to_string();
    assert!(!id.is_empty(), "record should carry an id: {record}");
    assert_eq!(record["operation_label"], "smoke");

    vtguard(temp_dir.path())?
        .args(["backup", "verify", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("matches its checksum"));

    let target = temp_dir.path().join("restored.json");
    vtguard(temp_dir.path())?
        .args(["backup", "restore", &id, "--target"])
        .arg(&target)
        .assert()
        .success();
    assert_eq!(fs::read(&target)?, br#"{"theme":"dark"}"#);

    vtguard(temp_dir.path())?
        .args(["--json", "backup", "usage"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"backup_count\": 1"));
    Ok(())
}
