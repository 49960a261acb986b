use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vtguard_commons::SafetyError;

/// File operations known to the policy engine, permission service and
/// confirmation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOperation {
    Read,
    List,
    Stat,
    Create,
    Write,
    Copy,
    Move,
    Delete,
    Mkdir,
    Rmdir,
    Chmod,
    Chown,
    Execute,
}

/// Access an operation needs on the path itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredAccess {
    None,
    Read,
    Write,
    Execute,
    Owner,
    Root,
}

impl FileOperation {
    pub const ALL: [FileOperation; 13] = [
        Self::Read,
        Self::List,
        Self::Stat,
        Self::Create,
        Self::Write,
        Self::Copy,
        Self::Move,
        Self::Delete,
        Self::Mkdir,
        Self::Rmdir,
        Self::Chmod,
        Self::Chown,
        Self::Execute,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::List => "list",
            Self::Stat => "stat",
            Self::Create => "create",
            Self::Write => "write",
            Self::Copy => "copy",
            Self::Move => "move",
            Self::Delete => "delete",
            Self::Mkdir => "mkdir",
            Self::Rmdir => "rmdir",
            Self::Chmod => "chmod",
            Self::Chown => "chown",
            Self::Execute => "execute",
        }
    }

    /// Removing or renaming an entry needs write access on its parent.
    pub fn requires_parent_write(self) -> bool {
        matches!(self, Self::Delete | Self::Move | Self::Rmdir)
    }

    pub fn required_access(self) -> RequiredAccess {
        match self {
            Self::Read | Self::List | Self::Copy => RequiredAccess::Read,
            Self::Stat | Self::Delete | Self::Move | Self::Rmdir => RequiredAccess::None,
            Self::Create | Self::Write | Self::Mkdir => RequiredAccess::Write,
            Self::Execute => RequiredAccess::Execute,
            Self::Chmod => RequiredAccess::Owner,
            Self::Chown => RequiredAccess::Root,
        }
    }
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileOperation {
    type Err = SafetyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|operation| operation.as_str() == needle)
            .ok_or_else(|| SafetyError::not_found("operation", value))
    }
}

/// Whether a path is a plain file or a directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    File,
    Directory,
}

impl PathKind {
    pub fn of(is_dir: bool) -> Self {
        if is_dir { Self::Directory } else { Self::File }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
        }
    }
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
