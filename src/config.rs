// src/config.rs
//! Configuration for the plugin pack manager
//!
//! Loaded from a TOML file. Every key is optional:
//!
//! ```toml
//! db_path = "/var/lib/ppm/ppm.db"
//! catalog_dir = "/var/lib/ppm/catalog"
//! log_level = "info"
//!
//! [sorter]
//! strict_parents = false
//! max_iterations = 10000
//! ```

use crate::error::{Error, Result};
use crate::resolver::{DEFAULT_MAX_ITERATIONS, ParentPolicy, TemplateSorter};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default database location
pub const DEFAULT_DB_PATH: &str = "/var/lib/ppm/ppm.db";

/// Default local manifest catalog
pub const DEFAULT_CATALOG_DIR: &str = "/var/lib/ppm/catalog";

/// Default configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ppm/ppm.toml";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Root of the `<slug>/<version>.json` catalog
    #[serde(default = "default_catalog_dir")]
    pub catalog_dir: PathBuf,

    /// Log filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub sorter: SorterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            catalog_dir: default_catalog_dir(),
            log_level: default_log_level(),
            sorter: SorterConfig::default(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_PATH)
}

fn default_catalog_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CATALOG_DIR)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

/// Template ordering settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SorterConfig {
    /// Release multi-parent templates only once every parent is written
    #[serde(default)]
    pub strict_parents: bool,

    /// Bound on ordering passes before giving up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            strict_parents: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl SorterConfig {
    pub fn policy(&self) -> ParentPolicy {
        if self.strict_parents {
            ParentPolicy::AllSatisfied
        } else {
            ParentPolicy::AnySatisfied
        }
    }

    /// A fresh sorter with these settings
    pub fn build_sorter(&self) -> TemplateSorter {
        TemplateSorter::new()
            .with_policy(self.policy())
            .with_max_iterations(self.max_iterations)
    }
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sorter.max_iterations == 0 {
            return Err(Error::Config("sorter.max_iterations must be at least 1".to_string()));
        }
        if self.log_level.trim().is_empty() {
            return Err(Error::Config("log_level must not be empty".to_string()));
        }
        Ok(())
    }
}
