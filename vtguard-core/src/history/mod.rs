//! Linear, session-scoped undo/redo ledger.
//!
//! Records are appended after their pre-state is captured. A single cursor
//! splits the sequence: everything before it can be undone, everything after
//! it can be redone, and appending discards the redo tail.

mod capture;
mod record;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vtguard_commons::fs::{copy_recursive, move_path, remove_path, set_permission_bits};
use vtguard_commons::{SafetyError, SafetyResult};
use vtguard_config::SafetyConfig;

pub use record::{
    CapturedDirectory, CapturedState, LedgerFailure, LedgerOutcome, LedgerResult,
    OperationKind, OperationRecord, RecordMetadata,
};

const DELETE_NOT_REVERSIBLE: &str = "deletion cannot be undone; restore it from the trash instead";

#[derive(Debug)]
pub struct OperationLedger {
    records: Vec<OperationRecord>,
    /// Number of records currently applied; `records[applied..]` is the redo tail.
    applied: usize,
    max_history_size: usize,
    backup_dir: PathBuf,
}

impl OperationLedger {
    pub fn new(max_history_size: usize, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            records: Vec::new(),
            applied: 0,
            max_history_size: max_history_size.max(1),
            backup_dir: backup_dir.into(),
        }
    }

    pub fn from_config(config: &SafetyConfig) -> Self {
        Self::new(config.history.max_history_size, config.history_dir())
    }

    pub fn initialize(&self) -> SafetyResult<()> {
        fs::create_dir_all(&self.backup_dir)
            .map_err(|err| SafetyError::io("creating history directory", &self.backup_dir, err))
    }

    /// Drop every record and the snapshots backing them.
    pub fn shutdown(&mut self) -> SafetyResult<()> {
        let removed = self.clear();
        debug!(removed, "History ledger shut down");
        Ok(())
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Capture pre-state for `kind` on `original_path` and append a record.
    ///
    /// Call this before performing a `write`, `chmod` or `rmdir`, since those
    /// snapshot the current state. Move and copy need `target_path`.
    pub fn record(
        &mut self,
        kind: OperationKind,
        original_path: &Path,
        target_path: Option<&Path>,
        description: Option<&str>,
    ) -> LedgerResult {
        if kind.needs_target() && target_path.is_none() {
            return Err(LedgerFailure::new(
                None,
                SafetyError::NotSupported {
                    operation: "record",
                    reason: format!("{kind} requires a target path"),
                },
            ));
        }

        let id = Uuid::new_v4().simple().to_string();
        let (metadata, reversible) =
            capture::capture(kind, &id, original_path, target_path, &self.backup_dir);

        let description = description.map(str::to_string).unwrap_or_else(|| {
            match target_path {
                Some(target) => format!(
                    "{kind} {} -> {}",
                    original_path.display(),
                    target.display()
                ),
                None => format!("{kind} {}", original_path.display()),
            }
        });

        let record = OperationRecord {
            id,
            kind,
            timestamp: Utc::now(),
            reversible,
            description,
            metadata,
        };

        let discarded: Vec<OperationRecord> = self.records.drain(self.applied..).collect();
        if !discarded.is_empty() {
            debug!(count = discarded.len(), "Discarding redo tail");
        }
        for stale in &discarded {
            Self::discard_snapshot(stale);
        }

        self.records.push(record.clone());
        self.applied = self.records.len();

        while self.records.len() > self.max_history_size {
            let evicted = self.records.remove(0);
            self.applied = self.applied.saturating_sub(1);
            debug!(id = %evicted.id, kind = %evicted.kind, "Evicting oldest history record");
            Self::discard_snapshot(&evicted);
        }

        debug!(id = %record.id, %kind, reversible, "Recorded operation");
        Ok(LedgerOutcome {
            message: format!("recorded {}", record.description),
            record,
        })
    }

    /// Reverse the most recent applied record.
    pub fn undo(&mut self) -> LedgerResult {
        let Some(index) = self.applied.checked_sub(1) else {
            return Err(LedgerFailure::new(
                None,
                SafetyError::NoOperation { action: "undo" },
            ));
        };
        let record = self.records[index].clone();

        if record.kind == OperationKind::Delete {
            return Err(LedgerFailure::new(
                Some(record),
                SafetyError::NotReversible {
                    reason: DELETE_NOT_REVERSIBLE.to_string(),
                },
            ));
        }
        if !record.reversible {
            let reason = record
                .metadata
                .capture_error
                .clone()
                .unwrap_or_else(|| "pre-state was not captured".to_string());
            return Err(LedgerFailure::new(
                Some(record),
                SafetyError::NotReversible { reason },
            ));
        }

        match Self::apply_undo(&record) {
            Ok(()) => {
                self.applied = index;
                info!(id = %record.id, kind = %record.kind, path = %record.original_path().display(), "Undid operation");
                Ok(LedgerOutcome {
                    message: format!("undid {}", record.description),
                    record,
                })
            }
            Err(error) => Err(LedgerFailure::new(Some(record), error)),
        }
    }

    /// Re-apply the next record in the redo tail.
    pub fn redo(&mut self) -> LedgerResult {
        let Some(record) = self.records.get(self.applied).cloned() else {
            return Err(LedgerFailure::new(
                None,
                SafetyError::NoOperation { action: "redo" },
            ));
        };

        match Self::apply_redo(&record) {
            Ok(()) => {
                self.applied += 1;
                info!(id = %record.id, kind = %record.kind, path = %record.original_path().display(), "Redid operation");
                Ok(LedgerOutcome {
                    message: format!("redid {}", record.description),
                    record,
                })
            }
            Err(error) => Err(LedgerFailure::new(Some(record), error)),
        }
    }

    fn apply_undo(record: &OperationRecord) -> SafetyResult<()> {
        let original = record.original_path();
        match record.kind {
            OperationKind::Delete => Err(SafetyError::NotReversible {
                reason: DELETE_NOT_REVERSIBLE.to_string(),
            }),
            OperationKind::Create => fs::remove_file(original)
                .map_err(|err| SafetyError::io("removing created file", original, err)),
            OperationKind::Write => {
                let backup = record.metadata.backup_path.as_deref().ok_or_else(|| {
                    SafetyError::NotReversible {
                        reason: "no snapshot was stored for this write".to_string(),
                    }
                })?;
                fs::copy(backup, original)
                    .map_err(|err| SafetyError::io("restoring snapshot onto", original, err))?;
                if let Some(state) = &record.metadata.original_state {
                    state.to_file_state().restore_onto(original);
                }
                Ok(())
            }
            OperationKind::Move => {
                let target = Self::require_target(record)?;
                move_path(target, original)
            }
            OperationKind::Copy => {
                let target = Self::require_target(record)?;
                remove_path(target)
            }
            OperationKind::Mkdir => fs::remove_dir(original)
                .map_err(|err| SafetyError::io("removing created directory", original, err)),
            OperationKind::Chmod => {
                let state = Self::require_state(record)?;
                set_permission_bits(original, state.mode)
                    .map_err(|err| SafetyError::io("restoring mode of", original, err))
            }
            OperationKind::Rmdir => {
                let state = Self::require_state(record)?;
                fs::create_dir_all(original)
                    .map_err(|err| SafetyError::io("recreating directory", original, err))?;
                for entry in &record.metadata.captured_directory_entries {
                    let path = original.join(&entry.relative_path);
                    fs::create_dir_all(&path)
                        .map_err(|err| SafetyError::io("recreating directory", &path, err))?;
                }
                // Children first so restrictive parent modes do not block them.
                for entry in record.metadata.captured_directory_entries.iter().rev() {
                    let path = original.join(&entry.relative_path);
                    if let Err(error) = set_permission_bits(&path, entry.mode) {
                        warn!(path = %path.display(), %error, "Failed to restore directory mode");
                    }
                }
                set_permission_bits(original, state.mode)
                    .map_err(|err| SafetyError::io("restoring mode of", original, err))
            }
        }
    }

    fn apply_redo(record: &OperationRecord) -> SafetyResult<()> {
        let original = record.original_path();
        match record.kind {
            OperationKind::Create => {
                if let Some(parent) = original.parent() {
                    fs::create_dir_all(parent)
                        .map_err(|err| SafetyError::io("creating directory", parent, err))?;
                }
                fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(original)
                    .map(|_| ())
                    .map_err(|err| SafetyError::io("recreating file", original, err))
            }
            OperationKind::Move => {
                let target = Self::require_target(record)?;
                move_path(original, target)
            }
            OperationKind::Copy => {
                let target = Self::require_target(record)?;
                copy_recursive(original, target)
            }
            OperationKind::Mkdir => fs::create_dir(original)
                .map_err(|err| SafetyError::io("recreating directory", original, err)),
            OperationKind::Write => Err(SafetyError::NotSupported {
                operation: "redo",
                reason: "written content is not stored, so a write cannot be replayed".to_string(),
            }),
            OperationKind::Delete => Err(SafetyError::NotSupported {
                operation: "redo",
                reason: "deletions are not replayed; delete the path again instead".to_string(),
            }),
            OperationKind::Chmod => Err(SafetyError::NotSupported {
                operation: "redo",
                reason: "the new mode is not stored, so chmod cannot be replayed".to_string(),
            }),
            OperationKind::Rmdir => Err(SafetyError::NotSupported {
                operation: "redo",
                reason: "directory removal is not replayed".to_string(),
            }),
        }
    }

    fn require_target(record: &OperationRecord) -> SafetyResult<&Path> {
        record
            .target_path()
            .ok_or_else(|| SafetyError::NotReversible {
                reason: format!("{} record has no target path", record.kind),
            })
    }

    fn require_state(record: &OperationRecord) -> SafetyResult<&CapturedState> {
        record
            .metadata
            .original_state
            .as_ref()
            .ok_or_else(|| SafetyError::NotReversible {
                reason: format!("{} record has no captured state", record.kind),
            })
    }

    fn discard_snapshot(record: &OperationRecord) {
        if let Some(backup) = &record.metadata.backup_path
            && let Err(error) = fs::remove_file(backup)
            && error.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %backup.display(), %error, "Failed to delete history snapshot");
        }
    }

    /// Remove every record and snapshot. Returns how many records were dropped.
    pub fn clear(&mut self) -> usize {
        for record in &self.records {
            Self::discard_snapshot(record);
        }
        let count = self.records.len();
        self.records.clear();
        self.applied = 0;
        count
    }

    /// Oldest first.
    pub fn history(&self) -> Vec<OperationRecord> {
        self.records.clone()
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the most recent applied record, if any.
    pub fn cursor(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vtguard_commons::ErrorKind;

    fn ledger(tmp: &TempDir, max: usize) -> OperationLedger {
        let ledger = OperationLedger::new(max, tmp.path().join("history"));
        ledger.initialize().unwrap();
        ledger
    }

    #[test]
    fn empty_ledger_has_nothing_to_undo_or_redo() {
        let tmp = TempDir::new().unwrap();
        let mut ledger = ledger(&tmp, 10);
        assert_eq!(ledger.undo().unwrap_err().kind(), ErrorKind::NoOperation);
        assert_eq!(ledger.redo().unwrap_err().kind(), ErrorKind::NoOperation);
        assert_eq!(ledger.cursor(), None);
    }

    #[test]
    fn move_requires_target() {
        let tmp = TempDir::new().unwrap();
        let mut ledger = ledger(&tmp, 10);
        let failure = ledger
            .record(OperationKind::Move, &tmp.path().join("a"), None, None)
            .unwrap_err();
        assert_eq!(failure.kind(), ErrorKind::NotSupported);
        assert!(ledger.is_empty());
    }

    #[test]
    fn create_undo_and_redo() {
        let tmp = TempDir::new().unwrap();
        let mut ledger = ledger(&tmp, 10);
        let file = tmp.path().join("new.txt");
        fs::write(&file, b"").unwrap();

        ledger
            .record(OperationKind::Create, &file, None, None)
            .unwrap();
        ledger.undo().unwrap();
        assert!(!file.exists());
        ledger.redo().unwrap();
        assert!(file.exists());
        assert_eq!(fs::read(&file).unwrap(), b"");
    }

    #[test]
    fn failed_undo_keeps_cursor() {
        let tmp = TempDir::new().unwrap();
        let mut ledger = ledger(&tmp, 10);
        let dir = tmp.path().join("made");
        fs::create_dir(&dir).unwrap();
        ledger.record(OperationKind::Mkdir, &dir, None, None).unwrap();
        fs::write(dir.join("child"), b"x").unwrap();

        let failure = ledger.undo().unwrap_err();
        assert!(failure.record.is_some());
        assert!(ledger.can_undo());
        assert_eq!(ledger.cursor(), Some(0));
    }

    #[test]
    fn unsupported_redo_kinds() {
        let tmp = TempDir::new().unwrap();
        let mut ledger = ledger(&tmp, 10);
        let file = tmp.path().join("w.txt");
        fs::write(&file, b"before").unwrap();
        ledger.record(OperationKind::Write, &file, None, None).unwrap();
        fs::write(&file, b"after").unwrap();
        ledger.undo().unwrap();

        let failure = ledger.redo().unwrap_err();
        assert_eq!(failure.kind(), ErrorKind::NotSupported);
        assert!(ledger.can_redo());
    }

    #[test]
    fn capture_failure_marks_record_irreversible() {
        let tmp = TempDir::new().unwrap();
        let mut ledger = ledger(&tmp, 10);
        let missing = tmp.path().join("missing.txt");
        let outcome = ledger
            .record(OperationKind::Write, &missing, None, None)
            .unwrap();
        assert!(!outcome.record.reversible);
        assert!(outcome.record.metadata.backup_path.is_none());
        assert_eq!(ledger.undo().unwrap_err().kind(), ErrorKind::NotReversible);
    }

    #[cfg(unix)]
    #[test]
    fn chmod_and_rmdir_round_trip() {
        use vtguard_commons::FileState;

        let tmp = TempDir::new().unwrap();
        let mut ledger = ledger(&tmp, 10);

        let file = tmp.path().join("script.sh");
        fs::write(&file, b"#!/bin/sh").unwrap();
        set_permission_bits(&file, 0o644).unwrap();
        ledger.record(OperationKind::Chmod, &file, None, None).unwrap();
        set_permission_bits(&file, 0o755).unwrap();
        ledger.undo().unwrap();
        assert_eq!(FileState::capture(&file).unwrap().mode, 0o644);

        let tree = tmp.path().join("tree");
        fs::create_dir_all(tree.join("a/b")).unwrap();
        set_permission_bits(&tree.join("a"), 0o700).unwrap();
        ledger.record(OperationKind::Rmdir, &tree, None, None).unwrap();
        fs::remove_dir_all(&tree).unwrap();
        ledger.undo().unwrap();
        assert!(tree.join("a/b").is_dir());
        assert_eq!(FileState::capture(&tree.join("a")).unwrap().mode, 0o700);
    }

    #[test]
    fn clear_removes_snapshots() {
        let tmp = TempDir::new().unwrap();
        let mut ledger = ledger(&tmp, 10);
        let file = tmp.path().join("doc.md");
        fs::write(&file, b"v1").unwrap();
        let outcome = ledger.record(OperationKind::Write, &file, None, None).unwrap();
        let snapshot = outcome.record.metadata.backup_path.unwrap();
        assert!(snapshot.exists());

        assert_eq!(ledger.clear(), 1);
        assert!(!snapshot.exists());
        assert!(!ledger.can_undo());
    }
}
