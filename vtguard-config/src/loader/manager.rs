use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::constants::files;
use crate::loader::layers::{ConfigLayerEntry, ConfigLayerSource, ConfigLayerStack};
use crate::root::SafetyConfig;

/// Locations searched below the workspace layers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSearchPaths {
    pub system: Option<PathBuf>,
    pub user: Vec<PathBuf>,
}

impl ConfigSearchPaths {
    /// System file on Unix plus `~/.vtguard/vtguard.toml`.
    pub fn detect() -> Self {
        let system = if cfg!(unix) {
            Some(PathBuf::from(files::SYSTEM_CONFIG_PATH))
        } else {
            None
        };
        let user = dirs::home_dir()
            .map(|home| {
                vec![
                    home.join(files::CONFIG_DIR_NAME)
                        .join(files::CONFIG_FILE_NAME),
                ]
            })
            .unwrap_or_default();
        Self { system, user }
    }

    /// No system or user layers; only workspace or explicit files count.
    pub fn isolated() -> Self {
        Self::default()
    }
}

/// Loads and validates [`SafetyConfig`] from layered TOML files.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: SafetyConfig,
    config_path: Option<PathBuf>,
    workspace_root: Option<PathBuf>,
    layer_stack: ConfigLayerStack,
}

impl ConfigManager {
    /// Load from `VTGUARD_CONFIG_PATH`, `VTGUARD_WORKSPACE`, or the current
    /// directory, in that order.
    pub fn load() -> Result<Self> {
        if let Ok(config_path) = std::env::var(files::CONFIG_PATH_ENV_VAR) {
            let trimmed = config_path.trim();
            if !trimmed.is_empty() {
                return Self::load_from_file(trimmed).with_context(|| {
                    format!(
                        "Failed to load configuration from {}={}",
                        files::CONFIG_PATH_ENV_VAR,
                        trimmed
                    )
                });
            }
        }

        if let Ok(workspace_path) = std::env::var(files::WORKSPACE_ENV_VAR) {
            let trimmed = workspace_path.trim();
            if !trimmed.is_empty() {
                return Self::load_from_workspace(trimmed).with_context(|| {
                    format!(
                        "Failed to load configuration from {}={}",
                        files::WORKSPACE_ENV_VAR,
                        trimmed
                    )
                });
            }
        }

        let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
        Self::load_from_workspace(cwd)
    }

    pub fn load_from_workspace(workspace: impl AsRef<Path>) -> Result<Self> {
        Self::load_from_workspace_with(workspace, &ConfigSearchPaths::detect())
    }

    pub fn load_from_workspace_with(
        workspace: impl AsRef<Path>,
        search: &ConfigSearchPaths,
    ) -> Result<Self> {
        let workspace_root = workspace.as_ref().to_path_buf();
        let mut layer_stack = Self::base_layers(search);

        // .vtguard/vtguard.toml, then vtguard.toml at the workspace root
        let candidates = [
            workspace_root
                .join(files::CONFIG_DIR_NAME)
                .join(files::CONFIG_FILE_NAME),
            workspace_root.join(files::CONFIG_FILE_NAME),
        ];
        for file in candidates {
            Self::push_optional_layer(&mut layer_stack, ConfigLayerSource::Workspace { file });
        }

        Self::finish(layer_stack, Some(workspace_root))
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_from_file_with(path, &ConfigSearchPaths::detect())
    }

    /// Base layers plus `path`, which must exist and parse.
    pub fn load_from_file_with(path: impl AsRef<Path>, search: &ConfigSearchPaths) -> Result<Self> {
        let path = path.as_ref();
        let mut layer_stack = Self::base_layers(search);

        let toml = Self::load_toml_from_file(path)?;
        layer_stack.push(ConfigLayerEntry::new(
            ConfigLayerSource::Explicit {
                file: path.to_path_buf(),
            },
            toml,
        ));

        Self::finish(layer_stack, path.parent().map(Path::to_path_buf))
            .with_context(|| format!("Failed to load config file: {}", path.display()))
    }

    fn base_layers(search: &ConfigSearchPaths) -> ConfigLayerStack {
        let mut layer_stack = ConfigLayerStack::default();
        if let Some(system) = &search.system {
            Self::push_optional_layer(
                &mut layer_stack,
                ConfigLayerSource::System {
                    file: system.clone(),
                },
            );
        }
        for user in &search.user {
            Self::push_optional_layer(
                &mut layer_stack,
                ConfigLayerSource::User { file: user.clone() },
            );
        }
        layer_stack
    }

    /// Layers below the explicit file are optional: missing files are skipped,
    /// unreadable ones are logged and skipped.
    fn push_optional_layer(layer_stack: &mut ConfigLayerStack, source: ConfigLayerSource) {
        let file = source.file();
        if !file.exists() {
            return;
        }
        match Self::load_toml_from_file(file) {
            Ok(toml) => {
                debug!(file = %file.display(), "Loaded configuration layer");
                layer_stack.push(ConfigLayerEntry::new(source, toml));
            }
            Err(error) => {
                warn!(file = %file.display(), error = %format!("{error:#}"), "Ignoring unreadable configuration layer");
            }
        }
    }

    fn finish(layer_stack: ConfigLayerStack, workspace_root: Option<PathBuf>) -> Result<Self> {
        let config: SafetyConfig = if layer_stack.is_empty() {
            SafetyConfig::default()
        } else {
            layer_stack
                .effective_config()
                .try_into()
                .context("Failed to deserialize effective configuration")?
        };

        config
            .validate()
            .context("Configuration failed validation")?;

        let config_path = layer_stack
            .layers()
            .last()
            .map(|layer| layer.source.file().to_path_buf());

        Ok(Self {
            config,
            config_path,
            workspace_root,
            layer_stack,
        })
    }

    fn load_toml_from_file(path: &Path) -> Result<toml::Value> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let value: toml::Value = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(value)
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    pub fn into_config(self) -> SafetyConfig {
        self.config
    }

    /// Highest-precedence file that contributed, if any.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    pub fn layer_stack(&self) -> &ConfigLayerStack {
        &self.layer_stack
    }

    pub fn effective_config(&self) -> toml::Value {
        self.layer_stack.effective_config()
    }
}
