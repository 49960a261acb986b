use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use vtguard_commons::ErrorKind;
use vtguard_core::{OperationKind, OperationLedger};

fn ledger(tmp: &TempDir, max: usize) -> OperationLedger {
    let ledger = OperationLedger::new(max, tmp.path().join("history"));
    ledger.initialize().unwrap();
    ledger
}

fn fixed_time() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_600_000_000)
}

#[cfg(unix)]
fn mode_of(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).unwrap().permissions().mode() & 0o7777
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

#[test]
fn write_garbage_then_undo_restores_bytes_mode_and_mtime() {
    let tmp = TempDir::new().unwrap();
    let mut ledger = ledger(&tmp, 10);
    let file = tmp.path().join("config.json");
    fs::write(&file, br#"{"ok":true}"#).unwrap();
    #[cfg(unix)]
    set_mode(&file, 0o640);
    File::options()
        .write(true)
        .open(&file)
        .unwrap()
        .set_modified(fixed_time())
        .unwrap();

    ledger
        .record(OperationKind::Write, &file, None, None)
        .unwrap();
    fs::write(&file, b"\x00garbage\xff").unwrap();
    #[cfg(unix)]
    set_mode(&file, 0o777);

    let outcome = ledger.undo().unwrap();
    assert_eq!(outcome.record.kind, OperationKind::Write);
    assert_eq!(fs::read(&file).unwrap(), br#"{"ok":true}"#);
    assert_eq!(fs::metadata(&file).unwrap().modified().unwrap(), fixed_time());
    #[cfg(unix)]
    assert_eq!(mode_of(&file), 0o640);

    let redo = ledger.redo().unwrap_err();
    assert_eq!(redo.kind(), ErrorKind::NotSupported);
}

#[test]
fn create_move_copy_mkdir_round_trip() {
    let tmp = TempDir::new().unwrap();
    let mut ledger = ledger(&tmp, 10);

    let created = tmp.path().join("new.txt");
    fs::write(&created, b"").unwrap();
    ledger.record(OperationKind::Create, &created, None, None).unwrap();
    ledger.undo().unwrap();
    assert!(!created.exists());
    ledger.redo().unwrap();
    assert!(created.exists());

    let source = tmp.path().join("a.txt");
    let moved = tmp.path().join("b.txt");
    fs::write(&source, b"move me").unwrap();
    ledger
        .record(OperationKind::Move, &source, Some(&moved), None)
        .unwrap();
    fs::rename(&source, &moved).unwrap();
    ledger.undo().unwrap();
    assert_eq!(fs::read(&source).unwrap(), b"move me");
    assert!(!moved.exists());
    ledger.redo().unwrap();
    assert!(!source.exists());
    assert_eq!(fs::read(&moved).unwrap(), b"move me");

    let copy = tmp.path().join("c.txt");
    fs::copy(&moved, &copy).unwrap();
    ledger
        .record(OperationKind::Copy, &moved, Some(&copy), None)
        .unwrap();
    ledger.undo().unwrap();
    assert!(!copy.exists());
    ledger.redo().unwrap();
    assert_eq!(fs::read(&copy).unwrap(), b"move me");

    let dir = tmp.path().join("made");
    fs::create_dir(&dir).unwrap();
    ledger.record(OperationKind::Mkdir, &dir, None, None).unwrap();
    ledger.undo().unwrap();
    assert!(!dir.exists());
    ledger.redo().unwrap();
    assert!(dir.is_dir());
}

#[cfg(unix)]
#[test]
fn chmod_and_rmdir_undo() {
    let tmp = TempDir::new().unwrap();
    let mut ledger = ledger(&tmp, 10);

    let script = tmp.path().join("run.sh");
    fs::write(&script, b"#!/bin/sh\n").unwrap();
    set_mode(&script, 0o644);
    ledger.record(OperationKind::Chmod, &script, None, None).unwrap();
    set_mode(&script, 0o755);
    ledger.undo().unwrap();
    assert_eq!(mode_of(&script), 0o644);

    let tree = tmp.path().join("tree");
    fs::create_dir_all(tree.join("a/b")).unwrap();
    fs::create_dir_all(tree.join("c")).unwrap();
    set_mode(&tree.join("c"), 0o700);
    ledger.record(OperationKind::Rmdir, &tree, None, None).unwrap();
    fs::remove_dir_all(&tree).unwrap();
    ledger.undo().unwrap();
    assert!(tree.join("a/b").is_dir());
    assert_eq!(mode_of(&tree.join("c")), 0o700);
    assert_eq!(ledger.redo().unwrap_err().kind(), ErrorKind::NotSupported);
}

#[test]
fn new_record_discards_redo_tail() {
    let tmp = TempDir::new().unwrap();
    let mut ledger = ledger(&tmp, 10);
    for name in ["one", "two"] {
        let path = tmp.path().join(name);
        fs::write(&path, b"").unwrap();
        ledger.record(OperationKind::Create, &path, None, None).unwrap();
    }
    ledger.undo().unwrap();
    assert!(ledger.can_redo());

    let three = tmp.path().join("three");
    fs::write(&three, b"").unwrap();
    ledger.record(OperationKind::Create, &three, None, None).unwrap();

    assert!(!ledger.can_redo());
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.redo().unwrap_err().kind(), ErrorKind::NoOperation);
    let paths: Vec<_> = ledger
        .history()
        .iter()
        .map(|record| record.original_path().to_path_buf())
        .collect();
    assert_eq!(paths, vec![tmp.path().join("one"), three]);
}

#[test]
fn delete_is_never_silently_undone() {
    let tmp = TempDir::new().unwrap();
    let mut ledger = ledger(&tmp, 10);
    let file = tmp.path().join("gone.txt");
    fs::write(&file, b"x").unwrap();
    ledger.record(OperationKind::Delete, &file, None, None).unwrap();
    fs::remove_file(&file).unwrap();

    let failure = ledger.undo().unwrap_err();
    assert_eq!(failure.kind(), ErrorKind::NotReversible);
    assert!(failure.to_string().contains("restore it from the trash instead"));
    assert!(failure.record.is_some());
    assert!(ledger.can_undo());
    assert!(!file.exists());
}

#[test]
fn eviction_drops_oldest_record_and_its_snapshot() {
    let tmp = TempDir::new().unwrap();
    let mut ledger = ledger(&tmp, 2);
    let mut snapshots = Vec::new();
    for index in 0..3 {
        let path = tmp.path().join(format!("f{index}.txt"));
        fs::write(&path, format!("v{index}")).unwrap();
        let outcome = ledger.record(OperationKind::Write, &path, None, None).unwrap();
        snapshots.push(outcome.record.metadata.backup_path.clone().unwrap());
    }

    assert_eq!(ledger.len(), 2);
    assert!(!snapshots[0].exists());
    assert!(snapshots[1].exists());
    assert!(snapshots[2].exists());
    assert_eq!(
        ledger.history()[0].original_path(),
        tmp.path().join("f1.txt").as_path()
    );

    assert_eq!(ledger.clear(), 2);
    assert!(snapshots.iter().all(|snapshot| !snapshot.exists()));
    assert_eq!(ledger.undo().unwrap_err().kind(), ErrorKind::NoOperation);
}
