use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::constants::limits;

/// Permission checks and privilege elevation.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PermissionsConfig {
    /// How long a permission lookup stays cached.
    /// Default: 60 seconds
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,

    /// Upper bound for elevation probes and native trash commands.
    #[serde(default = "default_process_timeout_ms")]
    pub process_timeout_ms: u64,

    /// Allow elevation requests at all. When false every request is unavailable.
    #[serde(default = "default_true")]
    pub allow_elevation: bool,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: default_cache_ttl_seconds(),
            process_timeout_ms: default_process_timeout_ms(),
            allow_elevation: default_true(),
        }
    }
}

impl PermissionsConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.process_timeout_ms > 0,
            "permissions.process_timeout_ms must be greater than zero"
        );
        Ok(())
    }
}

fn default_cache_ttl_seconds() -> u64 {
    limits::DEFAULT_PERMISSION_CACHE_TTL_SECONDS
}

fn default_process_timeout_ms() -> u64 {
    limits::DEFAULT_PROCESS_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}
