use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::constants::{limits, storage};

/// Undo/redo ledger configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of records kept before the oldest is evicted.
    #[serde(default = "default_max_history_size")]
    pub max_history_size: usize,

    /// Directory holding pre-write snapshots used by undo.
    #[serde(default = "default_history_dir")]
    pub backup_directory: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_size: default_max_history_size(),
            backup_directory: default_history_dir(),
        }
    }
}

impl HistoryConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.max_history_size > 0,
            "history.max_history_size must be greater than zero"
        );
        ensure!(
            !self.backup_directory.trim().is_empty(),
            "history.backup_directory must not be empty"
        );
        Ok(())
    }
}

fn default_max_history_size() -> usize {
    limits::DEFAULT_MAX_HISTORY_SIZE
}

fn default_history_dir() -> String {
    storage::DEFAULT_HISTORY_DIR.to_string()
}
