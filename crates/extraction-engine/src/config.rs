//! Extraction Configuration
//!
//! Settings can be built in code or loaded through the `config` crate from
//! an optional file plus `TSFEAT_`-prefixed environment variables, e.g.
//! `TSFEAT_CONCURRENCY__WORKER_COUNT=4`.

use crate::error::ConfigurationError;
use feature_engine::{KindOverrides, ParameterCatalog};
use serde::{Deserialize, Serialize};
use series_grouper::ColumnRoles;
use std::path::Path;
use tracing::debug;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TSFEAT";

/// Scheduling model for one extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Single-threaded, in-process
    #[default]
    Sequential,
    /// Bounded worker pool
    Pooled,
}

/// How chunks are scheduled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub mode: ExecutionMode,
    /// Pool size; 0 selects sequential execution
    pub worker_count: usize,
    /// Items per batch; derived from item and worker count when unset
    pub batch_size: Option<usize>,
    pub show_progress: bool,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Sequential,
            worker_count: std::thread::available_parallelism().map_or(1, |n| n.get()),
            batch_size: None,
            show_progress: false,
        }
    }
}

impl ConcurrencyConfig {
    pub fn sequential() -> Self {
        Self {
            mode: ExecutionMode::Sequential,
            ..Default::default()
        }
    }

    pub fn pooled(worker_count: usize) -> Self {
        Self {
            mode: ExecutionMode::Pooled,
            worker_count,
            ..Default::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Mode actually used: a pool of zero workers runs sequentially
    pub fn effective_mode(&self) -> ExecutionMode {
        match self.mode {
            ExecutionMode::Pooled if self.worker_count > 0 => ExecutionMode::Pooled,
            _ => ExecutionMode::Sequential,
        }
    }
}

/// Everything one extraction needs besides its input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub concurrency: ConcurrencyConfig,
    pub roles: ColumnRoles,
    pub default_catalog: ParameterCatalog,
    pub kind_overrides: KindOverrides,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            concurrency: ConcurrencyConfig::default(),
            roles: ColumnRoles::default(),
            default_catalog: ParameterCatalog::comprehensive(),
            kind_overrides: KindOverrides::new(),
        }
    }
}

impl ExtractionConfig {
    /// Load from an optional file and `TSFEAT_` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// Load with a custom environment prefix.
    ///
    /// Later sources win: file values override defaults, environment
    /// values override the file.
    pub fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self, ConfigurationError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            debug!("Loading extraction config from {}", path.display());
            builder = builder.add_source(::config::File::from(path));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
