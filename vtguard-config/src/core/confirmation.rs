use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SKIP_PATTERNS, limits};

/// Interactive confirmation behaviour.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ConfirmationConfig {
    /// Paths never prompted for.
    #[serde(default = "default_skip_patterns")]
    pub skip_patterns: Vec<String>,

    /// Seconds to wait for an answer. Unset waits indefinitely.
    #[serde(default)]
    pub prompt_timeout_seconds: Option<u64>,

    /// Times the alternatives menu is re-shown after a timeout.
    #[serde(default = "default_max_reprompts")]
    pub max_reprompts: u32,

    /// Offer to remember each answer for the rest of the session.
    #[serde(default)]
    pub offer_remember: bool,

    #[serde(default = "default_large_total_warning_bytes")]
    pub large_total_warning_bytes: u64,

    #[serde(default = "default_many_files_warning_threshold")]
    pub many_files_warning_threshold: u64,

    /// Entries printed by a dry run before the listing is truncated.
    #[serde(default = "default_dry_run_listing_limit")]
    pub dry_run_listing_limit: usize,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            skip_patterns: default_skip_patterns(),
            prompt_timeout_seconds: None,
            max_reprompts: default_max_reprompts(),
            offer_remember: false,
            large_total_warning_bytes: default_large_total_warning_bytes(),
            many_files_warning_threshold: default_many_files_warning_threshold(),
            dry_run_listing_limit: default_dry_run_listing_limit(),
        }
    }
}

impl ConfirmationConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(timeout) = self.prompt_timeout_seconds {
            ensure!(
                timeout > 0,
                "confirmation.prompt_timeout_seconds must be greater than zero when set"
            );
        }
        ensure!(
            self.dry_run_listing_limit > 0,
            "confirmation.dry_run_listing_limit must be greater than zero"
        );
        Ok(())
    }

    pub fn prompt_timeout(&self) -> Option<std::time::Duration> {
        self.prompt_timeout_seconds
            .map(std::time::Duration::from_secs)
    }
}

fn default_skip_patterns() -> Vec<String> {
    DEFAULT_SKIP_PATTERNS
        .iter()
        .map(|pattern| (*pattern).to_string())
        .collect()
}

fn default_max_reprompts() -> u32 {
    limits::DEFAULT_MAX_REPROMPTS
}

fn default_large_total_warning_bytes() -> u64 {
    limits::DEFAULT_LARGE_TOTAL_WARNING_BYTES
}

fn default_many_files_warning_threshold() -> u64 {
    limits::DEFAULT_MANY_FILES_WARNING_THRESHOLD
}

fn default_dry_run_listing_limit() -> usize {
    limits::DEFAULT_DRY_RUN_LISTING_LIMIT
}
