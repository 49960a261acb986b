use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vtguard_commons::{FileState, PathPattern, any_match};

use crate::policy::SecurityPolicy;

/// Severity of a single risk factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    /// Requires the path to be typed back before anything proceeds.
    Critical,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskFactor {
    pub level: RiskLevel,
    pub message: String,
    pub path: PathBuf,
}

impl RiskFactor {
    fn new(level: RiskLevel, path: &Path, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            path: path.to_path_buf(),
        }
    }
}

/// The most severe risk a path carries, if any.
///
/// Checks run from most to least severe and the first hit wins. `state` is
/// `None` for paths that do not exist; only lexical checks apply to those.
pub fn assess_path(
    policy: &SecurityPolicy,
    always_backup: &[PathPattern],
    path: &Path,
    state: Option<&FileState>,
) -> Option<RiskFactor> {
    if policy.is_system_path(path) {
        return Some(RiskFactor::new(RiskLevel::Critical, path, "system path"));
    }
    if policy.is_important_file(path) {
        return Some(RiskFactor::new(
            RiskLevel::High,
            path,
            "configuration or project file",
        ));
    }
    if policy.is_sensitive_path(path) {
        return Some(RiskFactor::new(RiskLevel::High, path, "sensitive path"));
    }
    if let Some(state) = state
        && is_executable(path, state)
    {
        return Some(RiskFactor::new(RiskLevel::Medium, path, "executable file"));
    }
    if any_match(always_backup, path) {
        return Some(RiskFactor::new(
            RiskLevel::Medium,
            path,
            "matches an always-backup pattern",
        ));
    }
    None
}

#[cfg(unix)]
fn is_executable(_path: &Path, state: &FileState) -> bool {
    !state.is_dir && state.mode & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(path: &Path, state: &FileState) -> bool {
    const EXECUTABLE_EXTENSIONS: &[&str] = &["exe", "bat", "cmd", "com", "ps1", "msi"];
    !state.is_dir
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                EXECUTABLE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtguard_commons::compile_patterns;
    use vtguard_config::PolicyConfig;

    fn policy() -> SecurityPolicy {
        SecurityPolicy::from_config(&PolicyConfig {
            additional_system_paths: vec!["/opt/critical".into()],
            ..PolicyConfig::default()
        })
        .unwrap()
    }

    fn file_state(mode: u32) -> FileState {
        FileState {
            is_dir: false,
            size: 1,
            mode,
            uid: None,
            gid: None,
            modified: None,
            accessed: None,
        }
    }

    #[test]
    fn levels_are_ordered() {
        assert!(RiskLevel::Critical > RiskLevel::High);
        assert!(RiskLevel::High > RiskLevel::Medium);
        assert!(RiskLevel::Medium > RiskLevel::Low);
    }

    #[test]
    fn most_severe_check_wins() {
        let policy = policy();
        let always = compile_patterns(["*.lock"]).unwrap();

        let system = assess_path(&policy, &always, Path::new("/opt/critical/Cargo.toml"), None).unwrap();
        assert_eq!(system.level, RiskLevel::Critical);

        let manifest = assess_path(&policy, &always, Path::new("/work/app/Cargo.toml"), None).unwrap();
        assert_eq!(manifest.level, RiskLevel::High);

        let lock = assess_path(&policy, &always, Path::new("/work/app/yarn.lock"), None);
        assert!(lock.is_some_and(|risk| risk.level >= RiskLevel::Medium));

        assert!(assess_path(&policy, &always, Path::new("/work/app/notes.txt"), None).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn executables_are_medium_risk() {
        let policy = policy();
        let risk = assess_path(&policy, &[], Path::new("/work/bin/tool"), Some(&file_state(0o755))).unwrap();
        assert_eq!(risk.level, RiskLevel::Medium);
        assert!(assess_path(&policy, &[], Path::new("/work/bin/data"), Some(&file_state(0o644))).is_none());
    }
}
