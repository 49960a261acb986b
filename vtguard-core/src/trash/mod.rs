//! Reversible deletion.
//!
//! Items go to the desktop trash when one is available. Otherwise they are
//! moved into a private trash directory as `{id}_{basename}` and tracked in a
//! `metadata.json` journal so they can be restored later, even after a
//! restart.

mod entry;
mod native;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vtguard_commons::fs::{move_path, path_size, remove_path, set_permission_bits};
use vtguard_commons::{
    FileState, Journal, ProcessRunner, SafetyError, SafetyResult, absolutize,
    alternative_restore_path,
};
use vtguard_config::SafetyConfig;

pub use entry::{TrashEntry, TrashOutcome};
pub use native::NativeTrash;

use crate::environment::EnvironmentCapabilities;
use crate::operation::PathKind;
use crate::retention::{CleanupReport, age_cutoff};

const ID_LENGTH: usize = 12;

pub struct TrashManager {
    directory: PathBuf,
    journal: Journal<TrashEntry>,
    /// Oldest first.
    entries: Vec<TrashEntry>,
    native: Option<NativeTrash>,
    runner: Arc<dyn ProcessRunner>,
    process_timeout: Duration,
}

impl TrashManager {
    /// Manager for `directory`. `native` is consulted before the custom trash.
    pub fn new(
        directory: impl Into<PathBuf>,
        native: Option<NativeTrash>,
        runner: Arc<dyn ProcessRunner>,
        process_timeout: Duration,
    ) -> Self {
        let directory = directory.into();
        Self {
            journal: Journal::in_dir(&directory),
            directory,
            entries: Vec::new(),
            native,
            runner,
            process_timeout,
        }
    }

    pub fn from_config(
        config: &SafetyConfig,
        environment: &EnvironmentCapabilities,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        let native = if config.trash.use_native_trash && environment.native_trash_available {
            NativeTrash::detect()
        } else {
            None
        };
        Self::new(
            config.trash_dir(),
            native,
            runner,
            Duration::from_millis(config.permissions.process_timeout_ms),
        )
    }

    /// Create the trash directory and load the journal.
    pub fn initialize(&mut self) -> SafetyResult<()> {
        fs::create_dir_all(&self.directory)
            .map_err(|err| SafetyError::io("creating trash directory", &self.directory, err))?;
        self.entries = self.journal.load()?;
        self.entries.sort_by_key(|entry| entry.trashed_at);
        debug!(
            directory = %self.directory.display(),
            entries = self.entries.len(),
            "Trash initialized"
        );
        Ok(())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn native_backend(&self) -> Option<&NativeTrash> {
        self.native.as_ref()
    }

    pub async fn move_to_trash(&mut self, path: &Path) -> SafetyResult<TrashOutcome> {
        let path = absolutize(path);
        let state = FileState::capture(&path)?;

        if let Some(native) = &self.native
            && native
                .trash(self.runner.as_ref(), &path, state.is_dir, self.process_timeout)
                .await
        {
            info!(path = %path.display(), "Moved to native trash");
            return Ok(TrashOutcome {
                trash_id: None,
                native: true,
            });
        }

        let entry = self.move_into_custom_trash(&path, &state)?;
        Ok(TrashOutcome {
            trash_id: Some(entry.id),
            native: false,
        })
    }

    fn move_into_custom_trash(&mut self, path: &Path, state: &FileState) -> SafetyResult<TrashEntry> {
        fs::create_dir_all(&self.directory)
            .map_err(|err| SafetyError::io("creating trash directory", &self.directory, err))?;

        let size = path_size(path)?;
        let id = self.fresh_id();
        let basename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "item".to_string());
        let trashed_path = self.directory.join(format!("{id}_{basename}"));

        move_path(path, &trashed_path)?;

        let entry = TrashEntry {
            id,
            original_path: path.to_path_buf(),
            trashed_path: trashed_path.clone(),
            trashed_at: Utc::now(),
            size,
            kind: PathKind::of(state.is_dir),
            permission_bits: state.mode,
            owner: state.uid,
            group: state.gid,
        };
        self.entries.push(entry.clone());

        if let Err(error) = self.journal.persist(&self.entries) {
            // Put the item back so it is not stranded without a journal entry.
            self.entries.pop();
            if let Err(rollback) = move_path(&trashed_path, path) {
                warn!(path = %path.display(), %rollback, "Failed to roll back trash move");
            }
            return Err(error);
        }

        info!(id = %entry.id, path = %path.display(), size, "Moved to custom trash");
        Ok(entry)
    }

    fn fresh_id(&self) -> String {
        loop {
            let mut id = Uuid::new_v4().simple().to_string();
            id.truncate(ID_LENGTH);
            if !self.entries.iter().any(|entry| entry.id == id) {
                return id;
            }
        }
    }

    /// Restore an item, picking a `(restored N)` name if the original
    /// location is occupied.
    pub fn restore_from_trash(&mut self, id: &str) -> SafetyResult<PathBuf> {
        let index = self.position(id)?;
        let entry = self.entries[index].clone();

        let target = if entry.original_path.symlink_metadata().is_ok() {
            alternative_restore_path(&entry.original_path, |candidate| {
                candidate.symlink_metadata().is_ok()
            })
        } else {
            entry.original_path.clone()
        };

        move_path(&entry.trashed_path, &target)?;
        if let Err(error) = set_permission_bits(&target, entry.permission_bits) {
            warn!(path = %target.display(), %error, "Failed to restore permission bits");
        }

        self.entries.remove(index);
        self.journal.persist(&self.entries)?;

        info!(id, restored_to = %target.display(), "Restored from trash");
        Ok(target)
    }

    /// Remove an item for good.
    pub fn permanent_delete(&mut self, id: &str) -> SafetyResult<()> {
        let index = self.position(id)?;
        let entry = self.entries[index].clone();
        Self::remove_content(&entry)?;
        self.entries.remove(index);
        self.journal.persist(&self.entries)?;
        info!(id, "Permanently deleted trash item");
        Ok(())
    }

    /// Permanently delete items trashed more than `max_age_days` ago.
    pub fn clean_old_trash_items(&mut self, max_age_days: u64) -> SafetyResult<CleanupReport> {
        let cutoff = age_cutoff(max_age_days);
        self.remove_where(|entry| entry.trashed_at < cutoff)
    }

    pub fn empty_trash(&mut self) -> SafetyResult<CleanupReport> {
        self.remove_where(|_| true)
    }

    fn remove_where(&mut self, select: impl Fn(&TrashEntry) -> bool) -> SafetyResult<CleanupReport> {
        let mut report = CleanupReport::default();
        let mut kept = Vec::with_capacity(self.entries.len());

        for entry in std::mem::take(&mut self.entries) {
            if !select(&entry) {
                kept.push(entry);
                continue;
            }
            match Self::remove_content(&entry) {
                Ok(()) => report.removed += 1,
                Err(error) => {
                    report.record_failure(format!("{}: {error}", entry.id));
                    kept.push(entry);
                }
            }
        }

        self.entries = kept;
        self.journal.persist(&self.entries)?;
        debug!(removed = report.removed, failed = report.failed, "Trash cleanup finished");
        Ok(report)
    }

    fn remove_content(entry: &TrashEntry) -> SafetyResult<()> {
        match remove_path(&entry.trashed_path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == vtguard_commons::ErrorKind::NotFound => {
                warn!(id = %entry.id, path = %entry.trashed_path.display(), "Trash content already gone; dropping entry");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    fn position(&self, id: &str) -> SafetyResult<usize> {
        self.entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or_else(|| SafetyError::not_found("trash item", id))
    }

    /// Newest first.
    pub fn list(&self) -> Vec<TrashEntry> {
        self.entries.iter().rev().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<&TrashEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|entry| entry.size).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
