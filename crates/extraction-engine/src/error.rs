//! Extraction Error Types

use feature_engine::RegistryError;
use serde::Serialize;
use series_grouper::RoleError;
use thiserror::Error;

/// Fatal setup problems, raised before any chunk is dispatched
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A catalog names unknown calculators or malformed parameters
    #[error("{scope} catalog: {source}")]
    Catalog {
        scope: String,
        #[source]
        source: RegistryError,
    },

    /// Id/kind/value roles do not resolve against the input
    #[error(transparent)]
    Role(#[from] RoleError),

    #[error("batch size must be positive")]
    InvalidBatchSize,

    #[error("pooled backend needs at least one worker")]
    InvalidWorkerCount,

    /// Backend cannot accept work (e.g. already closed)
    #[error("execution backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("failed to build worker pool: {0}")]
    PoolBuild(String),

    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Errors that abort an extraction run
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Two emissions targeted the same result cell
    #[error("duplicate emission for entity {entity_key}, feature {variable}")]
    Integrity { entity_key: String, variable: String },

    /// A worker crashed; results collected so far are discarded.
    ///
    /// `batch` is the index of the failed batch. The sequential backend runs
    /// every item as a batch of one, so there it is the item index.
    #[error("worker failed on batch {batch}: {message}")]
    WorkerFailed { batch: usize, message: String },
}

/// Failure releasing backend resources; reported, never fatal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("teardown of {backend} backend failed: {message}")]
pub struct TeardownWarning {
    pub backend: String,
    pub message: String,
}
