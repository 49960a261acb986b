//! Filesystem helpers shared by the trash, backup and history components.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::{SafetyError, SafetyResult};

/// Point-in-time metadata captured before a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileState {
    pub is_dir: bool,
    pub size: u64,
    pub mode: u32,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub modified: Option<SystemTime>,
    pub accessed: Option<SystemTime>,
}

impl FileState {
    /// Capture metadata for `path` without following a trailing symlink.
    pub fn capture(path: &Path) -> SafetyResult<Self> {
        let metadata = fs::symlink_metadata(path)
            .map_err(|err| SafetyError::io("reading metadata of", path, err))?;
        Ok(Self::from_metadata(&metadata))
    }

    pub fn from_metadata(metadata: &fs::Metadata) -> Self {
        Self {
            is_dir: metadata.is_dir(),
            size: metadata.len(),
            mode: permission_bits(metadata),
            uid: owner_id(metadata),
            gid: group_id(metadata),
            modified: metadata.modified().ok(),
            accessed: metadata.accessed().ok(),
        }
    }

    /// Reapply mode and timestamps to `path`. Failures are logged and skipped.
    ///
    /// Times go first: the file may not be openable once a restrictive mode
    /// is back in place.
    pub fn restore_onto(&self, path: &Path) {
        if is_symlink(path) {
            return;
        }
        if let Err(error) = set_file_times(path, self.accessed, self.modified) {
            warn!(path = %path.display(), %error, "Failed to restore timestamps");
        }
        if let Err(error) = set_permission_bits(path, self.mode) {
            warn!(path = %path.display(), %error, "Failed to restore permission bits");
        }
    }
}

#[cfg(unix)]
pub fn permission_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
pub fn permission_bits(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[cfg(unix)]
fn owner_id(metadata: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.uid())
}

#[cfg(not(unix))]
fn owner_id(_metadata: &fs::Metadata) -> Option<u32> {
    None
}

#[cfg(unix)]
fn group_id(metadata: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.gid())
}

#[cfg(not(unix))]
fn group_id(_metadata: &fs::Metadata) -> Option<u32> {
    None
}

#[cfg(unix)]
pub fn set_permission_bits(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub fn set_permission_bits(path: &Path, mode: u32) -> std::io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(mode & 0o222 == 0);
    fs::set_permissions(path, permissions)
}

/// Set access and modification times on a file or directory.
pub fn set_file_times(
    path: &Path,
    accessed: Option<SystemTime>,
    modified: Option<SystemTime>,
) -> std::io::Result<()> {
    if accessed.is_none() && modified.is_none() {
        return Ok(());
    }
    let mut times = fs::FileTimes::new();
    if let Some(accessed) = accessed {
        times = times.set_accessed(accessed);
    }
    if let Some(modified) = modified {
        times = times.set_modified(modified);
    }

    #[cfg(unix)]
    let file = fs::File::open(path)?;
    #[cfg(not(unix))]
    let file = fs::OpenOptions::new().write(true).open(path)?;

    file.set_times(times)
}

/// Total size in bytes of a file, or of every file beneath a directory.
pub fn path_size(path: &Path) -> SafetyResult<u64> {
    let metadata = fs::symlink_metadata(path)
        .map_err(|err| SafetyError::io("reading metadata of", path, err))?;
    if !metadata.is_dir() {
        return Ok(metadata.len());
    }

    let mut total: u64 = 0;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                debug!(path = %path.display(), %error, "Skipping unreadable entry while sizing");
                continue;
            }
        };
        if entry.file_type().is_file()
            && let Ok(meta) = entry.metadata()
        {
            total = total.saturating_add(meta.len());
        }
    }
    Ok(total)
}

/// Counts of files and directories beneath (and including) `path`.
pub fn count_entries(path: &Path) -> (u64, u64) {
    let mut files: u64 = 0;
    let mut dirs: u64 = 0;
    for entry in WalkDir::new(path).follow_links(false).into_iter().flatten() {
        if entry.file_type().is_dir() {
            dirs = dirs.saturating_add(1);
        } else {
            files = files.saturating_add(1);
        }
    }
    (files, dirs)
}

/// Copy a file, or a directory tree, from `source` to `destination`.
pub fn copy_recursive(source: &Path, destination: &Path) -> SafetyResult<()> {
    let metadata = fs::symlink_metadata(source)
        .map_err(|err| SafetyError::io("reading metadata of", source, err))?;

    if !metadata.is_dir() {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| SafetyError::io("creating directory", parent, err))?;
        }
        return copy_entry(source, destination, metadata.file_type().is_symlink());
    }

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(source).to_path_buf();
            SafetyError::io("walking", path, std::io::Error::other(err.to_string()))
        })?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|err| SafetyError::io("walking", entry.path(), std::io::Error::other(err)))?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|err| SafetyError::io("creating directory", &target, err))?;
            if let Ok(meta) = entry.metadata()
                && let Err(error) = set_permission_bits(&target, permission_bits(&meta))
            {
                debug!(path = %target.display(), %error, "Could not mirror directory mode");
            }
        } else {
            copy_entry(entry.path(), &target, entry.file_type().is_symlink())?;
        }
    }
    Ok(())
}

/// Symlinks are recreated rather than followed, so dangling links and links
/// to directories survive a copy unchanged.
fn copy_entry(source: &Path, destination: &Path, is_link: bool) -> SafetyResult<()> {
    if is_link {
        return copy_symlink(source, destination)
            .map_err(|err| SafetyError::io("copying symlink", source, err));
    }
    fs::copy(source, destination)
        .map(|_| ())
        .map_err(|err| SafetyError::io("copying", source, err))
}

#[cfg(unix)]
fn copy_symlink(source: &Path, destination: &Path) -> std::io::Result<()> {
    let link = fs::read_link(source)?;
    std::os::unix::fs::symlink(link, destination)
}

#[cfg(windows)]
fn copy_symlink(source: &Path, destination: &Path) -> std::io::Result<()> {
    let link = fs::read_link(source)?;
    if fs::metadata(source).is_ok_and(|meta| meta.is_dir()) {
        std::os::windows::fs::symlink_dir(link, destination)
    } else {
        std::os::windows::fs::symlink_file(link, destination)
    }
}

#[cfg(not(any(unix, windows)))]
fn copy_symlink(source: &Path, destination: &Path) -> std::io::Result<()> {
    fs::copy(source, destination).map(|_| ())
}

/// True when `path` itself is a symbolic link.
pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink())
}

/// Remove a file or a directory tree.
pub fn remove_path(path: &Path) -> SafetyResult<()> {
    let metadata = fs::symlink_metadata(path)
        .map_err(|err| SafetyError::io("reading metadata of", path, err))?;
    if metadata.is_dir() {
        fs::remove_dir_all(path).map_err(|err| SafetyError::io("removing directory", path, err))
    } else {
        fs::remove_file(path).map_err(|err| SafetyError::io("removing file", path, err))
    }
}

/// Move `source` to `destination`, falling back to copy + remove when a plain
/// rename is not possible (for example across filesystems).
pub fn move_path(source: &Path, destination: &Path) -> SafetyResult<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| SafetyError::io("creating directory", parent, err))?;
    }
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(error) => {
            debug!(
                from = %source.display(),
                to = %destination.display(),
                %error,
                "Rename failed; falling back to copy and remove"
            );
            copy_recursive(source, destination)?;
            remove_path(source)
        }
    }
}
