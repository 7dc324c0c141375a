use crate::error::{OracleError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What each committed block contributes to the observation window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleMode {
    /// Every transaction's fee rate
    #[default]
    AllObservations,
    /// Only the cheapest fee rate that made it into the block
    BlockMinimum,
}

/// Fee oracle configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Floor of every recommendation, also served before any data exists
    pub min_default: u64,

    /// Ceiling of every recommendation
    pub max_configured: u64,

    /// Number of blocks kept in the observation window
    pub window_size: usize,

    /// Rank (0-100) selected from the sorted window
    pub percentile: u32,

    pub sample_mode: SampleMode,

    /// Maximum number of historical blocks walked at startup
    pub bootstrap_limit: usize,

    /// Ingested blocks between recomputations of the cached recommendation
    pub flush_interval: u32,

    /// Capacity of the notification queue feeding the ingestion worker
    pub queue_capacity: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            min_default: 10_000_000_000,     // 10 gwei-equivalent
            max_configured: 100_000_000_000, // 100 gwei-equivalent
            window_size: 20,
            percentile: 60,
            sample_mode: SampleMode::AllObservations,
            bootstrap_limit: 128,
            flush_interval: 1,
            queue_capacity: 1000,
        }
    }
}

impl OracleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_default > self.max_configured {
            return Err(OracleError::Config(format!(
                "min_default {} exceeds max_configured {}",
                self.min_default, self.max_configured
            )));
        }
        if self.window_size == 0 {
            return Err(OracleError::Config("window_size must be positive".into()));
        }
        if self.percentile > 100 {
            return Err(OracleError::Config(format!(
                "percentile {} is outside 0-100",
                self.percentile
            )));
        }
        if self.flush_interval == 0 {
            return Err(OracleError::Config("flush_interval must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(OracleError::Config("queue_capacity must be positive".into()));
        }
        Ok(())
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents).context("Failed to parse oracle config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize oracle config")
    }
}
