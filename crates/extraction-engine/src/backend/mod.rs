//! Execution Backends
//!
//! A backend applies a function to every item and concatenates the results.
//! The engine only talks to [`ExecutionBackend`]; which implementation runs
//! is decided once per extraction from [`ConcurrencyConfig`].

mod pooled;
mod sequential;

pub use pooled::PooledBackend;
pub use sequential::SequentialBackend;

use crate::config::{ConcurrencyConfig, ExecutionMode};
use crate::error::{ConfigurationError, ExtractionError, TeardownWarning};
use crate::progress::LogProgress;
use std::any::Any;
use std::sync::Arc;
use tracing::info;

/// Batches handed to each worker when no batch size is given
const BATCHES_PER_WORKER: usize = 5;

/// Capability shared by every backend
pub trait ExecutionBackend {
    /// Short backend name for logs and reports
    fn name(&self) -> &'static str;

    /// Fail if the backend cannot take work right now.
    ///
    /// Called before anything is dispatched.
    fn ensure_ready(&self) -> Result<(), ConfigurationError>;

    /// Apply `func` to every item and concatenate the outputs.
    ///
    /// `func` must not share mutable state across calls. Output order is
    /// unspecified.
    fn map_reduce<T, R, F>(
        &self,
        func: F,
        items: Vec<T>,
        batch_size: Option<usize>,
    ) -> Result<Vec<R>, ExtractionError>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> Vec<R> + Sync;

    /// Release pooled resources. Idempotent.
    fn close(&mut self) -> Result<(), TeardownWarning>;
}

/// Reject a zero batch size
pub fn validate_batch_size(batch_size: Option<usize>) -> Result<(), ConfigurationError> {
    match batch_size {
        Some(0) => Err(ConfigurationError::InvalidBatchSize),
        _ => Ok(()),
    }
}

/// Batch size giving each worker a handful of roughly equal batches
pub fn default_batch_size(items: usize, workers: usize) -> usize {
    let per_round = (workers * BATCHES_PER_WORKER).max(1);
    items.div_ceil(per_round).max(1)
}

/// Render a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Backend chosen from configuration
#[derive(Debug)]
pub enum Backend {
    Sequential(SequentialBackend),
    Pooled(PooledBackend),
}

impl Backend {
    /// Build the backend a configuration asks for
    pub fn from_config(config: &ConcurrencyConfig) -> Result<Self, ConfigurationError> {
        validate_batch_size(config.batch_size)?;

        let backend = match config.effective_mode() {
            ExecutionMode::Sequential => Backend::Sequential(SequentialBackend::new()),
            ExecutionMode::Pooled => Backend::Pooled(PooledBackend::new(config.worker_count)?),
        };
        info!("Selected {} backend ({} workers)", backend.name(), config.worker_count);

        Ok(if config.show_progress {
            backend.with_progress(Arc::new(LogProgress::default()))
        } else {
            backend
        })
    }

    fn with_progress(self, progress: Arc<LogProgress>) -> Self {
        match self {
            Backend::Sequential(b) => Backend::Sequential(b.with_progress(progress)),
            Backend::Pooled(b) => Backend::Pooled(b.with_progress(progress)),
        }
    }
}

impl ExecutionBackend for Backend {
    fn name(&self) -> &'static str {
        match self {
            Backend::Sequential(b) => b.name(),
            Backend::Pooled(b) => b.name(),
        }
    }

    fn ensure_ready(&self) -> Result<(), ConfigurationError> {
        match self {
            Backend::Sequential(b) => b.ensure_ready(),
            Backend::Pooled(b) => b.ensure_ready(),
        }
    }

    fn map_reduce<T, R, F>(
        &self,
        func: F,
        items: Vec<T>,
        batch_size: Option<usize>,
    ) -> Result<Vec<R>, ExtractionError>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> Vec<R> + Sync,
    {
        match self {
            Backend::Sequential(b) => b.map_reduce(func, items, batch_size),
            Backend::Pooled(b) => b.map_reduce(func, items, batch_size),
        }
    }

    fn close(&mut self) -> Result<(), TeardownWarning> {
        match self {
            Backend::Sequential(b) => b.close(),
            Backend::Pooled(b) => b.close(),
        }
    }
}
