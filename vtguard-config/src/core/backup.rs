use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ALWAYS_BACKUP_PATTERNS, limits, storage};

/// Backup subsystem configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BackupConfig {
    /// Create backups before destructive operations. `force` bypasses this.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_backup_dir")]
    pub directory: String,

    /// Files or directories larger than this are refused.
    #[serde(default = "default_max_backup_size_bytes")]
    pub max_backup_size_bytes: u64,

    /// Compress new backups with gzip unless the caller says otherwise.
    #[serde(default)]
    pub compress: bool,

    #[serde(default = "default_retention_days")]
    pub retention_days: u64,

    /// Paths that are always backed up before being touched.
    #[serde(default = "default_always_backup_patterns")]
    pub always_backup_patterns: Vec<String>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            directory: default_backup_dir(),
            max_backup_size_bytes: default_max_backup_size_bytes(),
            compress: false,
            retention_days: default_retention_days(),
            always_backup_patterns: default_always_backup_patterns(),
        }
    }
}

impl BackupConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.directory.trim().is_empty(),
            "backup.directory must not be empty"
        );
        ensure!(
            self.max_backup_size_bytes > 0,
            "backup.max_backup_size_bytes must be greater than zero"
        );
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_backup_dir() -> String {
    storage::DEFAULT_BACKUP_DIR.to_string()
}

fn default_max_backup_size_bytes() -> u64 {
    limits::DEFAULT_MAX_BACKUP_SIZE_BYTES
}

fn default_retention_days() -> u64 {
    limits::DEFAULT_BACKUP_RETENTION_DAYS
}

fn default_always_backup_patterns() -> Vec<String> {
    DEFAULT_ALWAYS_BACKUP_PATTERNS
        .iter()
        .map(|pattern| (*pattern).to_string())
        .collect()
}
