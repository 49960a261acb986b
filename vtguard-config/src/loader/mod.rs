pub mod layers;

mod manager;
mod merge;

pub use layers::{ConfigLayerEntry, ConfigLayerSource, ConfigLayerStack};
pub use manager::{ConfigManager, ConfigSearchPaths};
pub use merge::merge_toml_values;
