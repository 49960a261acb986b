use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::operation::PathKind;

/// One item held in the custom trash directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashEntry {
    pub id: String,
    pub original_path: PathBuf,
    pub trashed_path: PathBuf,
    pub trashed_at: DateTime<Utc>,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: PathKind,
    pub permission_bits: u32,
    #[serde(default)]
    pub owner: Option<u32>,
    #[serde(default)]
    pub group: Option<u32>,
}

/// Result of [`super::TrashManager::move_to_trash`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrashOutcome {
    /// Set when the item went to the custom trash and can be restored by id.
    pub trash_id: Option<String>,
    /// The desktop trash took the item.
    pub native: bool,
}
