pub mod builder;
pub mod defaults;
pub mod duration;
pub mod merge;
pub mod types;


pub use builder::ConfigBuilder;
pub use duration::parse_duration;
pub use types::*;

use crate::error::{Error, Result};
use std::path::Path;

/// Load the YAML configuration file, or an empty input when it does not exist
pub fn load_config(config_file: &Path) -> Result<ConfigInput> {
    if !config_file.exists() {
        return Ok(ConfigInput::default());
    }

    let contents = std::fs::read_to_string(config_file)?;
    serde_yaml::from_str(&contents).map_err(|e| {
        Error::Configuration(format!("Invalid config file {}: {}", config_file.display(), e))
    })
}
