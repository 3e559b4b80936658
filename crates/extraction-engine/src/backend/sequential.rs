//! In-process Sequential Backend

use super::{panic_message, validate_batch_size, ExecutionBackend};
use crate::error::{ConfigurationError, ExtractionError, TeardownWarning};
use crate::progress::{ProgressCallback, ProgressInfo};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Applies the function to each item in turn on the calling thread
#[derive(Default)]
pub struct SequentialBackend {
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl SequentialBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }
}

impl fmt::Debug for SequentialBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequentialBackend")
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl ExecutionBackend for SequentialBackend {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn ensure_ready(&self) -> Result<(), ConfigurationError> {
        Ok(())
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
        // Batching means nothing here, but a bad value is still bad
        validate_batch_size(batch_size)?;

        let start = Instant::now();
        let total = items.len();
        debug!("Sequential map over {} items", total);

        let mut results = Vec::new();
        // Each item is its own batch
        for (index, item) in items.into_iter().enumerate() {
            let produced = catch_unwind(AssertUnwindSafe(|| func(item))).map_err(|payload| {
                ExtractionError::WorkerFailed {
                    batch: index,
                    message: panic_message(payload.as_ref()),
                }
            })?;
            results.extend(produced);

            if let Some(progress) = &self.progress {
                progress.on_progress(&ProgressInfo {
                    backend: self.name(),
                    completed: index + 1,
                    total,
                    elapsed: start.elapsed(),
                });
            }
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
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        progress: AtomicUsize,
        complete: AtomicUsize,
    }

    impl ProgressCallback for Counting {
        fn on_progress(&self, _info: &ProgressInfo) {
            self.progress.fetch_add(1, Ordering::Relaxed);
        }

        fn on_complete(&self, _info: &ProgressInfo) {
            self.complete.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_concatenates_in_order() {
        let backend = SequentialBackend::new();
        let out = backend
            .map_reduce(|x: u32| vec![x, x + 100], vec![1, 2, 3], None)
            .unwrap();
        assert_eq!(out, vec![1, 101, 2, 102, 3, 103]);
    }

    #[test]
    fn test_reports_progress_per_item() {
        let counter = Arc::new(Counting::default());
        let backend = SequentialBackend::new().with_progress(counter.clone());
        backend.map_reduce(|x: u32| vec![x], vec![1, 2, 3, 4], None).unwrap();
        assert_eq!(counter.progress.load(Ordering::Relaxed), 4);
        assert_eq!(counter.complete.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_panic_becomes_worker_failure() {
        let backend = SequentialBackend::new();
        let result = backend.map_reduce(
            |x: u32| {
                if x == 2 {
                    panic!("bad item");
                }
                vec![x]
            },
            vec![1, 2, 3],
            None,
        );
        match result {
            Err(ExtractionError::WorkerFailed { batch, message }) => {
                // Second item, as a batch of one
                assert_eq!(batch, 1);
                assert_eq!(message, "bad item");
            }
            other => panic!("expected worker failure, got {other:?}"),
        }
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut backend = SequentialBackend::new();
        assert!(backend.close().is_ok());
        assert!(backend.close().is_ok());
        assert!(backend.ensure_ready().is_ok());
    }
}
