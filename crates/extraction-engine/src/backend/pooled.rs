//! Pooled Backend
//!
//! Items are split into batches and the batches run on a local rayon pool.
//! A local pool (rather than the global one) lets separate extractors run
//! with different worker counts in one process.

use super::{default_batch_size, panic_message, validate_batch_size, ExecutionBackend};
use crate::error::{ConfigurationError, ExtractionError, TeardownWarning};
use crate::progress::{ProgressCallback, ProgressInfo};
use rayon::prelude::*;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Runs batches on a fixed set of worker threads
pub struct PooledBackend {
    workers: usize,
    /// `None` once closed
    pool: Option<rayon::ThreadPool>,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl PooledBackend {
    /// Build a pool with `workers` threads
    pub fn new(workers: usize) -> Result<Self, ConfigurationError> {
        if workers == 0 {
            return Err(ConfigurationError::InvalidWorkerCount);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("extract-worker-{i}"))
            .build()
            .map_err(|e| ConfigurationError::PoolBuild(e.to_string()))?;

        info!("Started worker pool with {} threads", workers);

        Ok(Self {
            workers,
            pool: Some(pool),
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_none()
    }
}

impl fmt::Debug for PooledBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBackend")
            .field("workers", &self.workers)
            .field("closed", &self.is_closed())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Split `items` into consecutive batches of at most `size`
fn into_batches<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let mut batches = Vec::with_capacity(items.len().div_ceil(size));
    let mut current = Vec::with_capacity(size);
    for item in items {
        current.push(item);
        if current.len() == size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

impl ExecutionBackend for PooledBackend {
    fn name(&self) -> &'static str {
        "pooled"
    }

    fn ensure_ready(&self) -> Result<(), ConfigurationError> {
        if self.is_closed() {
            Err(ConfigurationError::BackendUnavailable(
                "worker pool has been closed".to_string(),
            ))
        } else {
            Ok(())
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
        validate_batch_size(batch_size)?;
        let pool = self.pool.as_ref().ok_or_else(|| {
            ConfigurationError::BackendUnavailable("worker pool has been closed".to_string())
        })?;

        let start = Instant::now();
        let size = batch_size.unwrap_or_else(|| default_batch_size(items.len(), self.workers));
        let batches = into_batches(items, size);
        let total = batches.len();
        debug!("Dispatching {} batches of up to {} items", total, size);

        let completed = AtomicUsize::new(0);
        let outcomes: Vec<Result<Vec<R>, ExtractionError>> = pool.install(|| {
            batches
                .into_par_iter()
                .enumerate()
                .map(|(index, batch)| {
                    let produced = catch_unwind(AssertUnwindSafe(|| {
                        batch.into_iter().flat_map(&func).collect::<Vec<R>>()
                    }))
                    .map_err(|payload| ExtractionError::WorkerFailed {
                        batch: index,
                        message: panic_message(payload.as_ref()),
                    });

                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(progress) = &self.progress {
                        progress.on_progress(&ProgressInfo {
                            backend: self.name(),
                            completed: done,
                            total,
                            elapsed: start.elapsed(),
                        });
                    }
                    produced
                })
                .collect()
        });

        let mut results = Vec::new();
        for outcome in outcomes {
            results.extend(outcome?);
        }

        if let Some(progress) = &self.progress {
            progress.on_complete(&ProgressInfo {
                backend: self.name(),
                completed: total,
                total,
                elapsed: start.elapsed(),
            });
        }

        Ok(results)
    }

    fn close(&mut self) -> Result<(), TeardownWarning> {
        if self.pool.take().is_some() {
            debug!("Worker pool shut down");
        }
        Ok(())
    }
}
