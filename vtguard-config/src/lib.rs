//! Configuration for the vtguard safety layer.
//!
//! [`SafetyConfig`] groups one table per component. [`ConfigManager`] builds it
//! from layered TOML files (system, user, workspace, explicit), merging them
//! with [`merge_toml_values`] and validating the result.

pub mod constants;
pub mod core;
pub mod loader;
pub mod root;

pub use crate::core::{
    BackupConfig, ConfirmationConfig, HistoryConfig, LoggingConfig, PermissionsConfig,
    PolicyConfig, TrashConfig,
};
pub use loader::{
    ConfigLayerEntry, ConfigLayerSource, ConfigLayerStack, ConfigManager, ConfigSearchPaths,
    merge_toml_values,
};
pub use root::SafetyConfig;
