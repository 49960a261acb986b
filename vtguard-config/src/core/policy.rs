use anyhow::{Result, bail};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_IMPORTANT_FILE_PATTERNS, DEFAULT_SENSITIVE_PATTERNS, DEFAULT_SYSTEM_PATHS,
    KNOWN_OPERATIONS,
};

/// Static security policy tables.
///
/// The built-in tables are always included unless `use_default_tables` is
/// turned off; the `additional_*` lists extend them.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PolicyConfig {
    #[serde(default = "default_true")]
    pub use_default_tables: bool,

    #[serde(default)]
    pub additional_system_paths: Vec<String>,

    #[serde(default)]
    pub additional_sensitive_patterns: Vec<String>,

    /// Configuration and important-file patterns that raise risk to high.
    #[serde(default)]
    pub additional_important_patterns: Vec<String>,

    /// Operations refused outright. Empty by default.
    #[serde(default)]
    pub blocked_operations: IndexSet<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            use_default_tables: default_true(),
            additional_system_paths: Vec::new(),
            additional_sensitive_patterns: Vec::new(),
            additional_important_patterns: Vec::new(),
            blocked_operations: IndexSet::new(),
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<()> {
        for operation in &self.blocked_operations {
            if !KNOWN_OPERATIONS.contains(&operation.as_str()) {
                bail!(
                    "policy.blocked_operations contains unknown operation '{}' (expected one of: {})",
                    operation,
                    KNOWN_OPERATIONS.join(", ")
                );
            }
        }
        Ok(())
    }

    pub fn system_paths(&self) -> Vec<String> {
        self.with_defaults(DEFAULT_SYSTEM_PATHS, &self.additional_system_paths)
    }

    pub fn sensitive_patterns(&self) -> Vec<String> {
        self.with_defaults(DEFAULT_SENSITIVE_PATTERNS, &self.additional_sensitive_patterns)
    }

    pub fn important_patterns(&self) -> Vec<String> {
        self.with_defaults(
            DEFAULT_IMPORTANT_FILE_PATTERNS,
            &self.additional_important_patterns,
        )
    }

    fn with_defaults(&self, defaults: &[&str], extra: &[String]) -> Vec<String> {
        let mut merged: IndexSet<String> = IndexSet::new();
        if self.use_default_tables {
            merged.extend(defaults.iter().map(|value| (*value).to_string()));
        }
        merged.extend(extra.iter().cloned());
        merged.into_iter().collect()
    }
}

fn default_true() -> bool {
    true
}
