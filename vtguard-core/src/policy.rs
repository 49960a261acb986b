//! Static classification of operations and paths.
//!
//! The policy is read-only once built. Every path is judged in two forms,
//! as written and with symlinks in its existing ancestors resolved, and the
//! stricter answer wins. System paths are compared by prefix and sensitive
//! paths are matched with precompiled patterns.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use vtguard_commons::{
    PathPattern, SafetyResult, any_match, compile_patterns, has_path_prefix, normalize_path,
    resolve_existing_ancestor,
};
use vtguard_config::PolicyConfig;

use crate::operation::FileOperation;

/// Outcome of [`SecurityPolicy::classify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub needs_confirmation: bool,
    pub needs_elevation: bool,
    pub reason: Option<String>,
}

impl PolicyDecision {
    /// No confirmation, no elevation, nothing to explain.
    pub fn is_unremarkable(&self) -> bool {
        self.allowed && !self.needs_confirmation && !self.needs_elevation
    }
}

#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    safe_operations: HashSet<FileOperation>,
    destructive_operations: HashSet<FileOperation>,
    blocked_operations: HashSet<FileOperation>,
    system_paths: Vec<PathBuf>,
    sensitive_patterns: Vec<PathPattern>,
    important_patterns: Vec<PathPattern>,
}

impl SecurityPolicy {
    pub fn from_config(config: &PolicyConfig) -> SafetyResult<Self> {
        let blocked_operations = config
            .blocked_operations
            .iter()
            .map(|name| name.parse::<FileOperation>())
            .collect::<SafetyResult<HashSet<_>>>()?;

        Ok(Self {
            safe_operations: [FileOperation::Read, FileOperation::List, FileOperation::Stat]
                .into_iter()
                .collect(),
            destructive_operations: [
                FileOperation::Write,
                FileOperation::Move,
                FileOperation::Delete,
                FileOperation::Rmdir,
                FileOperation::Chmod,
                FileOperation::Chown,
            ]
            .into_iter()
            .collect(),
            blocked_operations,
            system_paths: system_prefixes(&config.system_paths()),
            sensitive_patterns: compile_patterns(config.sensitive_patterns())?,
            important_patterns: compile_patterns(config.important_patterns())?,
        })
    }

    pub fn is_safe(&self, operation: FileOperation) -> bool {
        self.safe_operations.contains(&operation)
    }

    pub fn is_destructive(&self, operation: FileOperation) -> bool {
        self.destructive_operations.contains(&operation)
    }

    pub fn is_blocked(&self, operation: FileOperation) -> bool {
        self.blocked_operations.contains(&operation)
    }

    pub fn is_system_path(&self, path: &Path) -> bool {
        path_forms(path).iter().any(|form| {
            self.system_paths
                .iter()
                .any(|prefix| has_path_prefix(form, prefix))
        })
    }

    pub fn is_sensitive_path(&self, path: &Path) -> bool {
        path_forms(path)
            .iter()
            .any(|form| any_match(&self.sensitive_patterns, form))
    }

    /// Configuration or build files whose loss is costly.
    pub fn is_important_file(&self, path: &Path) -> bool {
        path_forms(path)
            .iter()
            .any(|form| any_match(&self.important_patterns, form))
    }

    pub fn classify(&self, operation: FileOperation, path: &Path) -> PolicyDecision {
        if self.is_blocked(operation) {
            return PolicyDecision {
                allowed: false,
                needs_confirmation: false,
                needs_elevation: false,
                reason: Some(format!("operation '{operation}' is blocked by policy")),
            };
        }

        let destructive = self.is_destructive(operation);
        let system = self.is_system_path(path);
        let sensitive = self.is_sensitive_path(path);

        let reason = match (system, sensitive, destructive) {
            (true, _, _) => Some(format!("{} is a system path", path.display())),
            (false, true, _) => Some(format!("{} is a sensitive path", path.display())),
            (false, false, true) => Some(format!("'{operation}' is a destructive operation")),
            (false, false, false) => None,
        };

        PolicyDecision {
            allowed: true,
            needs_confirmation: destructive || sensitive,
            needs_elevation: system || (sensitive && destructive),
            reason,
        }
    }
}

/// Configured prefixes, plus their canonical form where that differs
/// (`/etc` is `/private/etc` on macOS).
fn system_prefixes(configured: &[String]) -> Vec<PathBuf> {
    let mut prefixes = Vec::with_capacity(configured.len());
    for path in configured {
        let lexical = normalize_path(Path::new(path));
        let resolved = resolve_existing_ancestor(&lexical);
        if resolved != lexical {
            prefixes.push(resolved);
        }
        prefixes.push(lexical);
    }
    prefixes
}

fn path_forms(path: &Path) -> Vec<PathBuf> {
    let lexical = normalize_path(path);
    let resolved = resolve_existing_ancestor(path);
    if resolved == lexical {
        vec![lexical]
    } else {
        vec![lexical, resolved]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn policy(blocked: &[&str]) -> SecurityPolicy {
        let mut config = PolicyConfig::default();
        config
            .blocked_operations
            .extend(blocked.iter().map(|op| (*op).to_string()));
        SecurityPolicy::from_config(&config).unwrap()
    }

    #[test]
    fn blocked_operations_are_refused() {
        let policy = policy(&["chown"]);
        let decision = policy.classify(FileOperation::Chown, Path::new("/tmp/file"));
        assert!(!decision.allowed);
        assert!(policy.classify(FileOperation::Chmod, Path::new("/tmp/file")).allowed);
    }

    #[test]
    fn system_paths_need_elevation() {
        let policy = policy(&[]);
        let decision = policy.classify(FileOperation::Read, Path::new("/etc/hosts"));
        assert_eq!(
            (decision.allowed, decision.needs_confirmation, decision.needs_elevation),
            (true, false, true)
        );
        assert!(!policy.is_system_path(Path::new("/etcetera/hosts")));
        assert!(policy.is_system_path(Path::new("/usr/../etc/passwd")));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_into_system_paths_are_system_paths() {
        let tmp = tempfile::TempDir::new().unwrap();
        let system = tmp.path().join("sys");
        std::fs::create_dir_all(&system).unwrap();
        let link = tmp.path().join("link");
        std::os::unix::fs::symlink(&system, &link).unwrap();

        let config = PolicyConfig {
            use_default_tables: false,
            additional_system_paths: vec![system.display().to_string()],
            ..PolicyConfig::default()
        };
        let policy = SecurityPolicy::from_config(&config).unwrap();
        let through_link = link.join("hosts");
        assert!(policy.is_system_path(&through_link));
        assert!(policy.classify(FileOperation::Delete, &through_link).needs_elevation);
        assert!(!policy.is_system_path(&tmp.path().join("elsewhere/hosts")));
    }

    #[test]
    fn sensitive_destructive_needs_both() {
        let policy = policy(&[]);
        let path = Path::new("/work/app/.env");
        let read = policy.classify(FileOperation::Read, path);
        assert!(read.needs_confirmation);
        assert!(!read.needs_elevation);

        let delete = policy.classify(FileOperation::Delete, path);
        assert!(delete.needs_confirmation);
        assert!(delete.needs_elevation);
    }

    #[test]
    fn ordinary_paths_follow_operation_class() {
        let policy = policy(&[]);
        let path = Path::new("/work/app/src/main.rs");
        assert!(policy.classify(FileOperation::Read, path).is_unremarkable());
        assert!(policy.classify(FileOperation::Create, path).is_unremarkable());
        let delete = policy.classify(FileOperation::Delete, path);
        assert!(delete.needs_confirmation);
        assert!(!delete.needs_elevation);
        assert!(policy.is_safe(FileOperation::Stat));
        assert!(policy.is_destructive(FileOperation::Rmdir));
    }

    #[test]
    fn extra_tables_extend_defaults() {
        let config = PolicyConfig {
            additional_system_paths: vec!["/opt/corp".into()],
            additional_sensitive_patterns: vec!["*/secrets/*".into()],
            ..PolicyConfig::default()
        };
        let policy = SecurityPolicy::from_config(&config).unwrap();
        assert!(policy.is_system_path(Path::new("/opt/corp/bin/tool")));
        assert!(policy.is_sensitive_path(Path::new("/srv/app/secrets/token")));
        assert!(policy.is_system_path(Path::new("/etc/passwd")));
    }
}
