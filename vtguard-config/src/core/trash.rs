use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::constants::{limits, storage};

/// Trash subsystem configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TrashConfig {
    /// Prefer the desktop trash when the environment provides one.
    #[serde(default = "default_true")]
    pub use_native_trash: bool,

    /// Directory used when native trash is unavailable or fails.
    #[serde(default = "default_trash_dir")]
    pub directory: String,

    /// Age in days after which `trash clean` removes entries.
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            use_native_trash: default_true(),
            directory: default_trash_dir(),
            retention_days: default_retention_days(),
        }
    }
}

impl TrashConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.directory.trim().is_empty(),
            "trash.directory must not be empty"
        );
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_trash_dir() -> String {
    storage::DEFAULT_TRASH_DIR.to_string()
}

fn default_retention_days() -> u64 {
    limits::DEFAULT_TRASH_RETENTION_DAYS
}
