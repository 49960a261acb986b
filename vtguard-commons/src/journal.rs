//! On-disk JSON record lists backing the trash and backup metadata.

use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::Builder;
use tracing::{debug, warn};

use crate::errors::{SafetyError, SafetyResult};

/// File name used for every journal.
pub const JOURNAL_FILE_NAME: &str = "metadata.json";

/// A JSON list of records stored next to the content it describes.
#[derive(Debug, Clone)]
pub struct Journal<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T> Journal<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Journal stored as `metadata.json` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::at(dir.join(JOURNAL_FILE_NAME))
    }

    pub fn at(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location a corrupt journal is moved to.
    pub fn corrupt_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".corrupt");
        self.path.with_file_name(name)
    }

    /// Load every record.
    ///
    /// A missing journal is an empty list. A journal that does not parse is
    /// moved aside and the caller starts from an empty list.
    pub fn load(&self) -> SafetyResult<Vec<T>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No journal yet; starting empty");
                return Ok(Vec::new());
            }
            Err(err) => return Err(SafetyError::io("reading journal", &self.path, err)),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(records) => Ok(records),
            Err(parse_error) => {
                let aside = self.corrupt_path();
                warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    error = %parse_error,
                    "Journal is corrupt; moving it aside and starting empty"
                );
                fs::rename(&self.path, &aside)
                    .map_err(|err| SafetyError::io("moving corrupt journal", &self.path, err))?;
                Ok(Vec::new())
            }
        }
    }

    /// Write every record, replacing the journal atomically.
    pub fn persist(&self, records: &[T]) -> SafetyResult<()> {
        let parent = self.path.parent().ok_or_else(|| SafetyError::Journal {
            path: self.path.clone(),
            message: "journal path must have a parent directory".to_string(),
        })?;
        fs::create_dir_all(parent)
            .map_err(|err| SafetyError::io("creating journal directory", parent, err))?;

        let contents = serde_json::to_vec_pretty(records).map_err(|err| SafetyError::Journal {
            path: self.path.clone(),
            message: format!("failed to serialize records: {err}"),
        })?;

        let mut temp_file = Builder::new()
            .prefix(".metadata")
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(|err| SafetyError::io("creating temporary journal in", parent, err))?;
        temp_file
            .write_all(&contents)
            .map_err(|err| SafetyError::io("writing temporary journal for", &self.path, err))?;
        temp_file
            .as_file_mut()
            .sync_all()
            .map_err(|err| SafetyError::io("flushing journal", &self.path, err))?;
        temp_file
            .persist(&self.path)
            .map_err(|err| SafetyError::io("persisting journal", &self.path, err.error))?;

        debug!(path = %self.path.display(), records = records.len(), "Journal persisted");
        Ok(())
    }
}
