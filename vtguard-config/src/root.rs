use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use vtguard_commons::expand_home;

use crate::core::{
    BackupConfig, ConfirmationConfig, HistoryConfig, LoggingConfig, PermissionsConfig,
    PolicyConfig, TrashConfig,
};

/// Root configuration for every safety component.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SafetyConfig {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub trash: TrashConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub permissions: PermissionsConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SafetyConfig {
    pub fn validate(&self) -> Result<()> {
        self.history
            .validate()
            .context("Invalid history configuration")?;
        self.trash.validate().context("Invalid trash configuration")?;
        self.backup
            .validate()
            .context("Invalid backup configuration")?;
        self.permissions
            .validate()
            .context("Invalid permissions configuration")?;
        self.policy
            .validate()
            .context("Invalid policy configuration")?;
        self.confirmation
            .validate()
            .context("Invalid confirmation configuration")?;
        self.logging
            .validate()
            .context("Invalid logging configuration")?;
        Ok(())
    }

    /// Configuration with every storage directory placed under `root`.
    ///
    /// Used by tests and by callers that want an isolated sandbox.
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.history.backup_directory = root.join("history").to_string_lossy().into_owned();
        self.trash.directory = root.join("trash").to_string_lossy().into_owned();
        self.backup.directory = root.join("backups").to_string_lossy().into_owned();
        self
    }

    pub fn history_dir(&self) -> PathBuf {
        expand_home(&self.history.backup_directory)
    }

    pub fn trash_dir(&self) -> PathBuf {
        expand_home(&self.trash.directory)
    }

    pub fn backup_dir(&self) -> PathBuf {
        expand_home(&self.backup.directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_validate() {
        let config = SafetyConfig::default();
        config.validate().unwrap();
        assert_eq!(config.history.max_history_size, 100);
        assert_eq!(config.permissions.cache_ttl_seconds, 60);
        assert_eq!(config.logging.level, "warn");
        assert!(config.policy.blocked_operations.is_empty());
    }

    #[test]
    fn partial_tables_fill_in_defaults() {
        let config: SafetyConfig = toml::from_str(
            r#"
            [history]
            max_history_size = 5

            [policy]
            blocked_operations = ["chown"]
            "#,
        )
        .unwrap();
        assert_eq!(config.history.max_history_size, 5);
        assert_eq!(config.trash, TrashConfig::default());
        assert!(config.policy.blocked_operations.contains("chown"));
        config.validate().unwrap();
    }

    #[test]
    fn unknown_blocked_operation_is_rejected() {
        let mut config = SafetyConfig::default();
        config.policy.blocked_operations.insert("explode".into());
        let err = config.validate().unwrap_err();
        assert!(format!("{err:#}").contains("explode"));
    }

    #[test]
    fn zero_history_is_rejected() {
        let mut config = SafetyConfig::default();
        config.history.max_history_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn storage_root_redirects_directories() {
        let config = SafetyConfig::default().with_storage_root("/tmp/sandbox");
        assert_eq!(config.trash_dir(), PathBuf::from("/tmp/sandbox/trash"));
        assert_eq!(config.backup_dir(), PathBuf::from("/tmp/sandbox/backups"));
        assert_eq!(config.history_dir(), PathBuf::from("/tmp/sandbox/history"));
    }
}
