//! Pre-state capture performed before a record is appended.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use vtguard_commons::fs::permission_bits;
use vtguard_commons::{FileState, SafetyError, SafetyResult};
use walkdir::WalkDir;

use super::record::{CapturedDirectory, CapturedState, OperationKind, RecordMetadata};

/// Capture whatever `kind` needs for undo. Returns the metadata and whether
/// the record is reversible; capture failures are recorded, not raised.
pub(crate) fn capture(
    kind: OperationKind,
    record_id: &str,
    original: &Path,
    target: Option<&Path>,
    backup_dir: &Path,
) -> (RecordMetadata, bool) {
    let mut metadata = RecordMetadata {
        original_path: original.to_path_buf(),
        target_path: target.map(Path::to_path_buf),
        ..RecordMetadata::default()
    };

    let result = match kind {
        OperationKind::Delete => Err(SafetyError::NotReversible {
            reason: "deletions are recovered through the trash".to_string(),
        }),
        OperationKind::Create | OperationKind::Mkdir | OperationKind::Move | OperationKind::Copy => {
            Ok(())
        }
        OperationKind::Write => capture_write(record_id, original, backup_dir, &mut metadata),
        OperationKind::Chmod => FileState::capture(original).map(|state| {
            metadata.original_state = Some(CapturedState::from(&state));
        }),
        OperationKind::Rmdir => capture_directory_tree(original, &mut metadata),
    };

    match result {
        Ok(()) => {
            debug!(%kind, path = %original.display(), "Captured pre-state");
            (metadata, true)
        }
        Err(error) => {
            if kind != OperationKind::Delete {
                warn!(%kind, path = %original.display(), %error, "Pre-state capture failed; record is not reversible");
            }
            metadata.backup_path = None;
            metadata.capture_error = Some(error.to_string());
            (metadata, false)
        }
    }
}

fn capture_write(
    record_id: &str,
    original: &Path,
    backup_dir: &Path,
    metadata: &mut RecordMetadata,
) -> SafetyResult<()> {
    let state = FileState::capture(original)?;
    if state.is_dir {
        return Err(SafetyError::NotSupported {
            operation: "write capture",
            reason: format!("{} is a directory", original.display()),
        });
    }

    fs::create_dir_all(backup_dir)
        .map_err(|err| SafetyError::io("creating history directory", backup_dir, err))?;
    let backup_path = snapshot_path(backup_dir, record_id, original);
    fs::copy(original, &backup_path)
        .map_err(|err| SafetyError::io("snapshotting", original, err))?;

    metadata.backup_path = Some(backup_path);
    metadata.original_state = Some(CapturedState::from(&state));
    Ok(())
}

fn capture_directory_tree(original: &Path, metadata: &mut RecordMetadata) -> SafetyResult<()> {
    let state = FileState::capture(original)?;
    if !state.is_dir {
        return Err(SafetyError::NotSupported {
            operation: "rmdir capture",
            reason: format!("{} is not a directory", original.display()),
        });
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(original)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| SafetyError::Journal {
            path: original.to_path_buf(),
            message: format!("failed to list directory: {err}"),
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(original) else {
            continue;
        };
        let mode = entry
            .metadata()
            .map(|meta| permission_bits(&meta))
            .unwrap_or(0o755);
        entries.push(CapturedDirectory {
            relative_path: relative.to_path_buf(),
            mode,
        });
    }

    metadata.original_state = Some(CapturedState::from(&state));
    metadata.captured_directory_entries = entries;
    Ok(())
}

fn snapshot_path(backup_dir: &Path, record_id: &str, original: &Path) -> PathBuf {
    let name = original
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    backup_dir.join(format!("{record_id}_{name}"))
}
