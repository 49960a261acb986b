use std::path::{Component, Path, PathBuf};

use tracing::warn;

/// Normalize a path by resolving `.` and `..` components lexically.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Expand a leading `~` to the current user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Resolve `path` against the current directory and normalize it without
/// touching the filesystem.
pub fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize_path(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize_path(&cwd.join(path)),
        Err(error) => {
            warn!(path = %path.display(), %error, "Failed to read current directory; using path as-is");
            normalize_path(path)
        }
    }
}

/// Canonicalize when the path exists, otherwise fall back to [`absolutize`].
pub fn resolve_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| absolutize(path))
}

/// Resolve symlinks in the longest existing prefix of `path` and append the
/// components that do not exist yet.
///
/// Unlike [`resolve_path`], a link in a parent directory is still followed
/// when the final component is missing or dangling.
pub fn resolve_existing_ancestor(path: &Path) -> PathBuf {
    let path = absolutize(path);
    let mut existing = path.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(resolved) = std::fs::canonicalize(existing) {
            return missing
                .iter()
                .rev()
                .fold(resolved, |resolved, part| resolved.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return path.clone(),
        }
    }
}

/// Pick a free sibling of `path` of the form `stem (restored N).ext`.
///
/// `N` starts at 1 and increments until `is_taken` reports a free slot.
pub fn alternative_restore_path(path: &Path, is_taken: impl Fn(&Path) -> bool) -> PathBuf {
    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Dotfiles such as `.env` have no extension in the restore sense.
    let (stem, extension) = match file_name.rfind('.') {
        Some(idx) if idx > 0 => (&file_name[..idx], Some(&file_name[idx + 1..])),
        _ => (file_name.as_str(), None),
    };

    let mut counter: u32 = 1;
    loop {
        let candidate_name = match extension {
            Some(ext) => format!("{stem} (restored {counter}).{ext}"),
            None => format!("{stem} (restored {counter})"),
        };
        let candidate = parent.join(candidate_name);
        if !is_taken(&candidate) {
            return candidate;
        }
        counter = counter.saturating_add(1);
    }
}

/// Whether `path` lives under `prefix`, comparing whole components.
pub fn has_path_prefix(path: &Path, prefix: &Path) -> bool {
    normalize_path(path).starts_with(normalize_path(prefix))
}
