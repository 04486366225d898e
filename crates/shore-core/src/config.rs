//! Cleaning parameters shared by every processing unit.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid parameter {name} = {value}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Parameters for one cleaning run. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Smallest cluster, in cells, kept by the noise filter.
    #[serde(alias = "minCellCount")]
    pub min_cell_count: usize,
    /// Alongshore buffer, in cells, added on each side of an accretion
    /// cluster's footprint.
    #[serde(alias = "bufferBins")]
    pub buffer_bins: usize,
    /// Replace existing output files instead of skipping them.
    #[serde(alias = "overwriteExisting")]
    pub overwrite_existing: bool,
    /// Report what would be written without touching the filesystem.
    #[serde(alias = "dryRun")]
    pub dry_run: bool,
    /// In dry-run mode, process at most this many randomly chosen date
    /// folders. `None` processes all of them.
    #[serde(alias = "dryRunSample")]
    pub dry_run_sample: Option<usize>,
    /// Seed for the dry-run folder sample.
    pub seed: u64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            min_cell_count: 25,
            buffer_bins: 20,
            overwrite_existing: false,
            dry_run: true,
            dry_run_sample: Some(5),
            seed: 42,
        }
    }
}

impl CleaningConfig {
    /// Load from a JSON file and validate.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let cfg: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_cell_count == 0 {
            return Err(ConfigError::Invalid {
                name: "min_cell_count",
                value: self.min_cell_count.to_string(),
                reason: "must be at least 1",
            });
        }
        if self.dry_run_sample == Some(0) {
            return Err(ConfigError::Invalid {
                name: "dry_run_sample",
                value: "0".into(),
                reason: "must be at least 1 when set",
            });
        }
        Ok(())
    }
}
