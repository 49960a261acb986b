//! Checksummed backups taken before risky operations.
//!
//! Each backup is stored as `{timestamp}_{id}_{basename}` inside the backup
//! directory, optionally gzip-compressed (`.gz` for files, `.tar.gz` for
//! directories), and tracked in a `metadata.json` journal. Restores verify
//! the stored copy against its recorded checksum before touching the target.

mod checksum;
mod record;

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vtguard_commons::fs::{
    copy_recursive, is_symlink, move_path, path_size, remove_path, set_file_times,
    set_permission_bits,
};
use vtguard_commons::{
    ErrorKind, FileState, Journal, PathPattern, SafetyError, SafetyResult, absolutize,
    alternative_restore_path, any_match, compile_patterns,
};
use vtguard_config::{BackupConfig, SafetyConfig};
use walkdir::WalkDir;

pub use checksum::{directory_checksum, file_checksum, path_checksum};
pub use record::{BackupOptions, BackupOutcome, BackupRecord, DiskUsage, RestoreOptions};

use crate::operation::PathKind;
use crate::retention::{CleanupReport, age_cutoff};

const ID_LENGTH: usize = 12;
const ARCHIVE_ROOT: &str = "content";
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3fZ";

pub struct BackupManager {
    directory: PathBuf,
    journal: Journal<BackupRecord>,
    /// Oldest first.
    records: Vec<BackupRecord>,
    enabled: bool,
    compress_by_default: bool,
    max_backup_size_bytes: u64,
    always_backup: Vec<PathPattern>,
}

impl BackupManager {
    pub fn new(directory: impl Into<PathBuf>, config: &BackupConfig) -> SafetyResult<Self> {
        let directory = directory.into();
        Ok(Self {
            journal: Journal::in_dir(&directory),
            directory,
            records: Vec::new(),
            enabled: config.enabled,
            compress_by_default: config.compress,
            max_backup_size_bytes: config.max_backup_size_bytes,
            always_backup: compile_patterns(&config.always_backup_patterns)?,
        })
    }

    pub fn from_config(config: &SafetyConfig) -> SafetyResult<Self> {
        Self::new(config.backup_dir(), &config.backup)
    }

    pub fn initialize(&mut self) -> SafetyResult<()> {
        fs::create_dir_all(&self.directory)
            .map_err(|err| SafetyError::io("creating backup directory", &self.directory, err))?;
        self.records = self.journal.load()?;
        self.records.sort_by_key(|record| record.timestamp);
        debug!(
            directory = %self.directory.display(),
            backups = self.records.len(),
            "Backup manager initialized"
        );
        Ok(())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn should_always_backup(&self, path: &Path) -> bool {
        any_match(&self.always_backup, path)
    }

    pub fn create_backup(
        &mut self,
        path: &Path,
        label: &str,
        options: BackupOptions,
    ) -> SafetyResult<BackupOutcome> {
        if !self.enabled && !options.force {
            debug!(path = %path.display(), "Backups disabled; skipping");
            return Ok(BackupOutcome::Skipped);
        }

        let path = absolutize(path);
        let state = FileState::capture(&path)?;
        let size = path_size(&path)?;
        if size > self.max_backup_size_bytes {
            warn!(
                path = %path.display(),
                size,
                limit = self.max_backup_size_bytes,
                "Refusing oversized backup"
            );
            return Ok(BackupOutcome::TooLarge {
                size,
                limit: self.max_backup_size_bytes,
            });
        }

        fs::create_dir_all(&self.directory)
            .map_err(|err| SafetyError::io("creating backup directory", &self.directory, err))?;

        let compressed = options.compress.unwrap_or(self.compress_by_default);
        let timestamp = Utc::now();
        let id = self.fresh_id();
        let basename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "item".to_string());
        let extension = match (compressed, state.is_dir) {
            (false, _) => "",
            (true, false) => ".gz",
            (true, true) => ".tar.gz",
        };
        let backup_path = self.directory.join(format!(
            "{}_{id}_{basename}{extension}",
            timestamp.format(TIMESTAMP_FORMAT)
        ));

        let stored = store_copy(&path, &backup_path, state.is_dir, compressed).and_then(|()| {
            let content_is_dir = state.is_dir && !compressed;
            path_checksum(&backup_path, content_is_dir)
        });
        let checksum = match stored {
            Ok(checksum) => checksum,
            Err(error) => {
                discard(&backup_path);
                return Err(error);
            }
        };

        let record = BackupRecord {
            id,
            original_path: path.clone(),
            backup_path: backup_path.clone(),
            timestamp,
            size,
            checksum,
            kind: PathKind::of(state.is_dir),
            operation_label: label.to_string(),
            permission_bits: state.mode,
            mtime: state.modified.map(DateTime::<Utc>::from),
            atime: state.accessed.map(DateTime::<Utc>::from),
            compressed,
        };
        self.records.push(record.clone());
        if let Err(error) = self.journal.persist(&self.records) {
            self.records.pop();
            discard(&backup_path);
            return Err(error);
        }

        info!(
            id = %record.id,
            path = %path.display(),
            backup = %backup_path.display(),
            size,
            compressed,
            "Backup created"
        );
        Ok(BackupOutcome::Created { record })
    }

    fn fresh_id(&self) -> String {
        loop {
            let mut id = Uuid::new_v4().simple().to_string();
            id.truncate(ID_LENGTH);
            if !self.records.iter().any(|record| record.id == id) {
                return id;
            }
        }
    }

    /// Recompute the stored copy's checksum and compare it with the journal.
    pub fn verify_backup(&self, id: &str) -> SafetyResult<()> {
        let record = self.require(id)?;
        let content_is_dir = record.kind == PathKind::Directory && !record.compressed;
        let actual = path_checksum(&record.backup_path, content_is_dir)?;
        if actual != record.checksum {
            warn!(id, backup = %record.backup_path.display(), "Backup checksum mismatch");
            return Err(SafetyError::IntegrityError {
                path: record.backup_path.clone(),
                expected: record.checksum.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Restore a backup and return where it landed.
    pub fn restore_backup(&self, id: &str, options: &RestoreOptions) -> SafetyResult<PathBuf> {
        let record = self.require(id)?.clone();
        if options.verify_checksum {
            self.verify_backup(id)?;
        }

        let requested = options
            .target
            .as_deref()
            .map(absolutize)
            .unwrap_or_else(|| record.original_path.clone());
        let occupied = requested.symlink_metadata().is_ok();
        let replace = occupied && options.overwrite;
        let target = if occupied && !options.overwrite {
            let alternative =
                alternative_restore_path(&requested, |candidate| candidate.symlink_metadata().is_ok());
            debug!(
                requested = %requested.display(),
                alternative = %alternative.display(),
                "Restore target exists; using alternative path"
            );
            alternative
        } else {
            requested
        };

        // The current target is only touched once the copy is fully unpacked.
        let staging = sibling_path(&target, "restore");
        let placed = unpack_copy(&record, &staging)
            .and_then(|content| swap_into_place(&content, &target, replace));
        if let Err(error) = fs::remove_dir_all(&staging)
            && error.kind() != io::ErrorKind::NotFound
        {
            debug!(path = %staging.display(), %error, "Could not remove staging directory");
        }
        placed?;
        reapply_metadata(&record, &target);

        info!(id, restored_to = %target.display(), "Backup restored");
        Ok(target)
    }

    pub fn delete_backup(&mut self, id: &str) -> SafetyResult<()> {
        let index = self.position(id)?;
        remove_content(&self.records[index])?;
        self.records.remove(index);
        self.journal.persist(&self.records)?;
        info!(id, "Backup deleted");
        Ok(())
    }

    /// Delete backups taken more than `max_age_days` ago.
    pub fn cleanup_old_backups(&mut self, max_age_days: u64) -> SafetyResult<CleanupReport> {
        let cutoff = age_cutoff(max_age_days);
        let mut report = CleanupReport::default();
        let mut kept = Vec::with_capacity(self.records.len());

        for record in std::mem::take(&mut self.records) {
            if record.timestamp >= cutoff {
                kept.push(record);
                continue;
            }
            match remove_content(&record) {
                Ok(()) => report.removed += 1,
                Err(error) => {
                    report.record_failure(format!("{}: {error}", record.id));
                    kept.push(record);
                }
            }
        }

        self.records = kept;
        self.journal.persist(&self.records)?;
        debug!(removed = report.removed, failed = report.failed, "Backup cleanup finished");
        Ok(report)
    }

    /// Actual bytes on disk under the backup directory, journal excluded.
    pub fn disk_usage(&self) -> DiskUsage {
        let mut usage = DiskUsage {
            backup_count: self.records.len(),
            ..DiskUsage::default()
        };
        let journal_path = self.journal.path();
        for entry in WalkDir::new(&self.directory).follow_links(false).into_iter().flatten() {
            if !entry.file_type().is_file() || entry.path() == journal_path {
                continue;
            }
            if let Ok(metadata) = entry.metadata() {
                usage.total_bytes = usage.total_bytes.saturating_add(metadata.len());
                usage.file_count += 1;
            }
        }
        usage
    }

    /// Newest first.
    pub fn list(&self) -> Vec<BackupRecord> {
        self.records.iter().rev().cloned().collect()
    }

    /// Backups of `path`, newest first.
    pub fn backups_for(&self, path: &Path) -> Vec<BackupRecord> {
        let path = absolutize(path);
        self.records
            .iter()
            .rev()
            .filter(|record| record.original_path == path)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&BackupRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn require(&self, id: &str) -> SafetyResult<&BackupRecord> {
        self.get(id).ok_or_else(|| SafetyError::not_found("backup", id))
    }

    fn position(&self, id: &str) -> SafetyResult<usize> {
        self.records
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| SafetyError::not_found("backup", id))
    }
}

fn store_copy(source: &Path, destination: &Path, is_dir: bool, compress: bool) -> SafetyResult<()> {
    if !compress {
        return copy_recursive(source, destination);
    }

    let output =
        File::create(destination).map_err(|err| SafetyError::io("creating backup", destination, err))?;
    let encoder = GzEncoder::new(BufWriter::new(output), Compression::default());

    let written = if is_dir {
        archive_directory(source, encoder)
    } else {
        compress_file(source, encoder)
    };
    written.map_err(|err| SafetyError::io("compressing", source, err))
}

fn archive_directory(source: &Path, encoder: GzEncoder<BufWriter<File>>) -> io::Result<()> {
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    builder.append_dir_all(ARCHIVE_ROOT, source)?;
    builder.into_inner()?.finish()?.flush()?;
    Ok(())
}

fn compress_file(source: &Path, mut encoder: GzEncoder<BufWriter<File>>) -> io::Result<()> {
    let mut input = BufReader::new(File::open(source)?);
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.flush()?;
    Ok(())
}

/// Materialize the stored copy under `staging` and return where it landed.
fn unpack_copy(record: &BackupRecord, staging: &Path) -> SafetyResult<PathBuf> {
    let source = &record.backup_path;
    fs::create_dir_all(staging)
        .map_err(|err| SafetyError::io("creating directory", staging, err))?;
    let content = staging.join(ARCHIVE_ROOT);

    match (record.compressed, record.kind) {
        (false, _) => copy_recursive(source, &content)?,
        (true, PathKind::File) => {
            let input = File::open(source).map_err(|err| SafetyError::io("opening", source, err))?;
            let mut decoder = GzDecoder::new(BufReader::new(input));
            let mut output =
                File::create(&content).map_err(|err| SafetyError::io("creating", &content, err))?;
            io::copy(&mut decoder, &mut output)
                .map_err(|err| SafetyError::io("decompressing", source, err))?;
        }
        (true, PathKind::Directory) => {
            let input = File::open(source).map_err(|err| SafetyError::io("opening", source, err))?;
            tar::Archive::new(GzDecoder::new(BufReader::new(input)))
                .unpack(staging)
                .map_err(|err| SafetyError::io("unpacking", source, err))?;
        }
    }

    if content.symlink_metadata().is_err() {
        return Err(SafetyError::io(
            "unpacking",
            source,
            io::Error::new(io::ErrorKind::InvalidData, "archive has no content root"),
        ));
    }
    Ok(content)
}

/// Move unpacked content onto `target`. An existing target is set aside
/// first and put back if the move fails.
fn swap_into_place(content: &Path, target: &Path, replace: bool) -> SafetyResult<()> {
    if !replace {
        return move_path(content, target);
    }

    let aside = sibling_path(target, "replaced");
    fs::rename(target, &aside)
        .map_err(|err| SafetyError::io("setting aside", target, err))?;
    if let Err(error) = move_path(content, target) {
        if let Err(undo) = fs::rename(&aside, target) {
            warn!(
                path = %target.display(),
                aside = %aside.display(),
                error = %undo,
                "Could not put the original back after a failed restore"
            );
        }
        return Err(error);
    }
    if let Err(error) = remove_path(&aside) {
        warn!(path = %aside.display(), %error, "Failed to remove replaced content");
    }
    Ok(())
}

/// Hidden sibling of `target` such as `.notes.md.restore-1a2b3c4d`.
fn sibling_path(target: &Path, tag: &str) -> PathBuf {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(8);
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.{tag}-{suffix}"))
}

fn reapply_metadata(record: &BackupRecord, target: &Path) {
    if is_symlink(target) {
        return;
    }
    let accessed = record.atime.map(SystemTime::from);
    let modified = record.mtime.map(SystemTime::from);
    if let Err(error) = set_file_times(target, accessed, modified) {
        warn!(path = %target.display(), %error, "Failed to restore timestamps");
    }
    if let Err(error) = set_permission_bits(target, record.permission_bits) {
        warn!(path = %target.display(), %error, "Failed to restore permission bits");
    }
}

fn remove_content(record: &BackupRecord) -> SafetyResult<()> {
    match remove_path(&record.backup_path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == ErrorKind::NotFound => {
            warn!(id = %record.id, path = %record.backup_path.display(), "Backup content already gone; dropping record");
            Ok(())
        }
        Err(error) => Err(error),
    }
}

fn discard(path: &Path) {
    if path.symlink_metadata().is_ok()
        && let Err(error) = remove_path(path)
    {
        warn!(path = %path.display(), %error, "Failed to remove partial backup");
    }
}
