//! Configuration file
//!
//! JSON, every field optional. Unknown sections are rejected so a typo
//! does not silently fall back to a default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::{CliError, CliResult};
use crate::corpus::DEFAULT_HISTORY_RETENTION;
use crate::matching::ScoringWeights;
use crate::notify::NotifyConfig;
use crate::observability::LoggingConfig;
use crate::sync::RetryPolicy;

/// `sync` section: retry policy plus where the resumption checkpoint lives.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(flatten)]
    pub retry: RetryPolicy,
    /// Relative paths resolve against `data_dir`.
    #[serde(default)]
    pub checkpoint_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Snapshots retained for `changes --since`.
    pub history_retention: usize,
    pub scoring: ScoringWeights,
    pub sync: SyncConfig,
    pub notify: NotifyConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            history_retention: DEFAULT_HISTORY_RETENTION,
            scoring: ScoringWeights::default(),
            sync: SyncConfig::default(),
            notify: NotifyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Loads and validates a config file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::Config(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(CliError::Config("data_dir must not be empty".to_string()));
        }
        if self.history_retention == 0 {
            return Err(CliError::Config(
                "history_retention must be at least 1".to_string(),
            ));
        }
        self.scoring.validate().map_err(CliError::Config)?;
        self.sync.retry.validate().map_err(CliError::Config)?;
        self.notify
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        self.logging.validate().map_err(CliError::Config)?;
        Ok(())
    }

    pub fn data_path(&self) -> &Path {
        &self.data_dir
    }

    /// Absolute-or-data-relative checkpoint path, if one is configured.
    pub fn checkpoint_path(&self) -> Option<PathBuf> {
        self.sync.checkpoint_file.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                self.data_dir.join(p)
            }
        })
    }
}
