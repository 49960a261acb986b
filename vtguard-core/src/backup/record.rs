use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::operation::PathKind;

/// Journal entry for one stored backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: String,
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub timestamp: DateTime<Utc>,
    /// Size of the original content, before compression.
    pub size: u64,
    pub checksum: String,
    #[serde(rename = "type")]
    pub kind: PathKind,
    pub operation_label: String,
    pub permission_bits: u32,
    #[serde(default)]
    pub mtime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub atime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub compressed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupOptions {
    /// Back up even when backups are disabled in configuration.
    pub force: bool,
    /// Override the configured compression setting.
    pub compress: Option<bool>,
}

impl BackupOptions {
    pub fn forced() -> Self {
        Self {
            force: true,
            compress: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Restore here instead of the original location.
    pub target: Option<PathBuf>,
    /// Replace an existing target instead of picking a `(restored N)` name.
    pub overwrite: bool,
    /// Recompute the stored checksum before touching the target.
    pub verify_checksum: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            target: None,
            overwrite: false,
            verify_checksum: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackupOutcome {
    Created { record: BackupRecord },
    /// Backups are disabled and the request was not forced.
    Skipped,
    TooLarge { size: u64, limit: u64 },
}

impl BackupOutcome {
    pub fn record(&self) -> Option<&BackupRecord> {
        match self {
            Self::Created { record } => Some(record),
            Self::Skipped | Self::TooLarge { .. } => None,
        }
    }
}

/// Disk consumption of the backup directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub file_count: u64,
    pub backup_count: usize,
}
