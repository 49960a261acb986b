use std::path::{Path, PathBuf};

use toml::Value as TomlValue;

use crate::loader::merge_toml_values;

/// Where a configuration layer came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// `/etc/vtguard/vtguard.toml`
    System { file: PathBuf },
    /// `~/.vtguard/vtguard.toml`
    User { file: PathBuf },
    /// `.vtguard/vtguard.toml` or `vtguard.toml` inside the workspace
    Workspace { file: PathBuf },
    /// A file named on the command line or through `VTGUARD_CONFIG_PATH`
    Explicit { file: PathBuf },
}

impl ConfigLayerSource {
    pub fn file(&self) -> &Path {
        match self {
            Self::System { file }
            | Self::User { file }
            | Self::Workspace { file }
            | Self::Explicit { file } => file,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLayerEntry {
    pub source: ConfigLayerSource,
    pub config: TomlValue,
}

impl ConfigLayerEntry {
    pub fn new(source: ConfigLayerSource, config: TomlValue) -> Self {
        Self { source, config }
    }
}

/// Layers ordered from lowest to highest precedence.
#[derive(Debug, Clone, Default)]
pub struct ConfigLayerStack {
    layers: Vec<ConfigLayerEntry>,
}

impl ConfigLayerStack {
    pub fn push(&mut self, layer: ConfigLayerEntry) {
        self.layers.push(layer);
    }

    pub fn effective_config(&self) -> TomlValue {
        let mut merged = TomlValue::Table(toml::Table::new());
        for layer in &self.layers {
            merge_toml_values(&mut merged, &layer.config);
        }
        merged
    }

    pub fn layers(&self) -> &[ConfigLayerEntry] {
        &self.layers
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
