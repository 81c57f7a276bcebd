//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod parse;

use std::path::Path;

use bolletta_core::BollettaConfig;
use tracing::debug;

/// Load the configuration: explicit path, then the default file, then defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<BollettaConfig> {
    if let Some(path) = config_path {
        return Ok(BollettaConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Loading config from {}", default_path.display());
        Ok(BollettaConfig::from_file(&default_path)?)
    } else {
        Ok(BollettaConfig::default())
    }
}
