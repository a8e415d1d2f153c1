//! Run configuration loaded from `sluice.toml`.
//!
//! ```toml
//! parallel = true
//!
//! [sources]
//! branch_sales = "data/branch_sales.csv"
//! online_sales = "data/online_sales.csv"
//! customers = "data/customer_data.csv"
//! inventory = "data/inventory_data.csv"
//!
//! [destination]
//! kind = "sqlite"
//! path = "retail.db"
//!
//! [cleaning]
//! timestamp_format = "MM/DD/YYYY"
//! timestamp_policy = "SUBSTITUTE_DEFAULT"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SluiceError};
use crate::input::ParserConfig;
use crate::load::{CsvDirectory, Destination, SqliteDatabase};
use crate::transform::{CleaningConfig, DatasetTables};

/// Default config file name looked up by the CLI.
pub const DEFAULT_CONFIG_FILE: &str = "sluice.toml";

/// Where cleaned tables go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DestinationConfig {
    /// One `<table>.csv` file per dataset in a directory.
    Csv { path: PathBuf },
    /// One table per dataset in a SQLite file.
    Sqlite { path: PathBuf },
}

impl DestinationConfig {
    pub fn path(&self) -> &Path {
        match self {
            DestinationConfig::Csv { path } | DestinationConfig::Sqlite { path } => path,
        }
    }

    fn path_mut(&mut self) -> &mut PathBuf {
        match self {
            DestinationConfig::Csv { path } | DestinationConfig::Sqlite { path } => path,
        }
    }

    /// Build the destination this entry describes.
    pub fn open(&self) -> Box<dyn Destination> {
        match self {
            DestinationConfig::Csv { path } => Box::new(CsvDirectory::new(path)),
            DestinationConfig::Sqlite { path } => Box::new(SqliteDatabase::new(path)),
        }
    }
}

/// Complete configuration of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Clean the four datasets concurrently.
    #[serde(default)]
    pub parallel: bool,
    /// Raw extract per dataset.
    pub sources: DatasetTables<PathBuf>,
    pub destination: DestinationConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
    #[serde(default)]
    pub parser: ParserConfig,
}

impl PipelineConfig {
    /// Load a config file. Relative paths inside it resolve against the
    /// file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SluiceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_toml_str(&content, base)
    }

    /// Parse TOML, resolving relative paths against `base_dir`.
    pub fn from_toml_str(content: &str, base_dir: impl AsRef<Path>) -> Result<Self> {
        let mut config: PipelineConfig = toml::from_str(content)?;
        config.resolve_paths(base_dir.as_ref());
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SluiceError::Config(e.to_string()))
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.sources.branch_sales);
        resolve(&mut self.sources.online_sales);
        resolve(&mut self.sources.customers);
        resolve(&mut self.sources.inventory);
        resolve(self.destination.path_mut());
    }

    fn validate(&self) -> Result<()> {
        for (dataset, path) in self.sources.iter() {
            if path.as_os_str().is_empty() {
                return Err(SluiceError::Config(format!(
                    "Source path for {} is empty",
                    dataset
                )));
            }
        }
        if self.destination.path().as_os_str().is_empty() {
            return Err(SluiceError::Config(
                "Destination path is empty".to_string(),
            ));
        }
        Ok(())
    }
}
