//! Engine configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// How runner state carries across trading days.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Runners are built for each day and closed at its end. Capital, position
    /// and strategy state start fresh every day.
    #[default]
    Daily,
    /// Runners live for the whole run. Capital and position carry over and
    /// the close sequence only happens after the last day.
    Continuous,
}

/// Settings of a backtest run.
///
/// With the `serde` feature the configuration can be read from TOML:
///
/// ```toml
/// mode = "continuous"
/// workers = 4
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineConfig {
    /// Cross-day behavior of the runners.
    pub mode: RunMode,
    /// Number of worker threads replaying runners. `None` uses every CPU.
    pub workers: Option<usize>,
}

impl EngineConfig {
    /// Sets the run mode.
    pub fn mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the number of worker threads.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.workers == Some(0) {
            return Err(Error::InvalidConfig("workers must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Parses and validates a TOML configuration.
    #[cfg(feature = "serde")]
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML configuration file.
    #[cfg(feature = "serde")]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Returns the effective number of worker threads.
    #[cfg(feature = "parallel")]
    pub(crate) fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }
}
