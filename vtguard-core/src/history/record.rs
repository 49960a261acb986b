use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vtguard_commons::{ErrorKind, FileState, SafetyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Delete,
    Move,
    Copy,
    Write,
    Chmod,
    Mkdir,
    Rmdir,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Move => "move",
            Self::Copy => "copy",
            Self::Write => "write",
            Self::Chmod => "chmod",
            Self::Mkdir => "mkdir",
            Self::Rmdir => "rmdir",
        }
    }

    /// Kinds whose record is meaningless without a target path.
    pub fn needs_target(self) -> bool {
        matches!(self, Self::Move | Self::Copy)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable subset of [`FileState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedState {
    pub mode: u32,
    pub modified: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
}

impl From<&FileState> for CapturedState {
    fn from(state: &FileState) -> Self {
        Self {
            mode: state.mode,
            modified: state.modified.map(DateTime::<Utc>::from),
            accessed: state.accessed.map(DateTime::<Utc>::from),
        }
    }
}

impl CapturedState {
    pub fn to_file_state(&self) -> FileState {
        FileState {
            is_dir: false,
            size: 0,
            mode: self.mode,
            uid: None,
            gid: None,
            modified: self.modified.map(Into::into),
            accessed: self.accessed.map(Into::into),
        }
    }
}

/// A directory captured before `rmdir`, relative to the removed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedDirectory {
    pub relative_path: PathBuf,
    pub mode: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub original_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<PathBuf>,
    /// Pre-write snapshot used by `write` undo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_state: Option<CapturedState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captured_directory_entries: Vec<CapturedDirectory>,
    /// Why the pre-state could not be captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: String,
    pub kind: OperationKind,
    pub timestamp: DateTime<Utc>,
    pub reversible: bool,
    pub description: String,
    pub metadata: RecordMetadata,
}

impl OperationRecord {
    pub fn original_path(&self) -> &Path {
        &self.metadata.original_path
    }

    pub fn target_path(&self) -> Option<&Path> {
        self.metadata.target_path.as_deref()
    }
}

/// A successful ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerOutcome {
    pub record: OperationRecord,
    pub message: String,
}

/// A failed ledger mutation, carrying the record it was attempted on.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct LedgerFailure {
    pub record: Option<OperationRecord>,
    pub message: String,
    #[source]
    pub source: SafetyError,
}

impl LedgerFailure {
    pub fn new(record: Option<OperationRecord>, source: SafetyError) -> Self {
        let message = match &record {
            Some(record) => format!(
                "{} of {} failed: {source}",
                record.kind,
                record.metadata.original_path.display()
            ),
            None => source.to_string(),
        };
        Self {
            record,
            message,
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

pub type LedgerResult = Result<LedgerOutcome, LedgerFailure>;
