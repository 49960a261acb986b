use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default filter directive used when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        let level = self.level.trim().to_ascii_lowercase();
        // Full directives such as `vtguard_core=debug` are accepted as-is.
        if !level.contains('=') && !LEVELS.contains(&level.as_str()) {
            bail!(
                "logging.level '{}' is not one of: {}",
                self.level,
                LEVELS.join(", ")
            );
        }
        Ok(())
    }
}

fn default_level() -> String {
    "warn".to_string()
}
