//! Configuration loading and validation.

pub mod loader;
pub mod model;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::matcher::KeywordSet;
pub use model::{AppConfig, LabelField, LabelTable, Operation};

/// Holds the loaded configuration and the file it came from.
pub struct ConfigManager {
    config: AppConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Loads and validates the config file, creating it if missing.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config = loader::load_and_validate(config_path)?;

        Ok(Self {
            config,
            config_path: config_path.to_path_buf(),
        })
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Returns the path to the configuration file.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Compiles the configured keywords.
    pub fn keywords(&self) -> Result<KeywordSet> {
        Ok(KeywordSet::new(self.config.keywords.iter().cloned())?)
    }
}
