//! Progress Reporting

use std::time::Duration;
use tracing::info;

/// Snapshot of a running map-reduce
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Backend doing the work
    pub backend: &'static str,
    /// Units finished (items for sequential, batches for pooled)
    pub completed: usize,
    pub total: usize,
    pub elapsed: Duration,
}

impl ProgressInfo {
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

/// Callback invoked by backends as work completes.
///
/// Called from worker threads under the pooled backend.
pub trait ProgressCallback: Send + Sync {
    /// Called after each finished unit of work
    fn on_progress(&self, info: &ProgressInfo);

    /// Called once after the last unit
    fn on_complete(&self, info: &ProgressInfo);
}

/// Reports progress through `tracing` at roughly every tenth of the work
#[derive(Debug, Clone)]
pub struct LogProgress {
    title: String,
}

impl LogProgress {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new("Feature Extraction")
    }
}

impl ProgressCallback for LogProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let step = (info.total / 10).max(1);
        if info.completed % step == 0 && info.completed < info.total {
            info!(
                "{}: [{}/{}] {:.1}% ({})",
                self.title,
                info.completed,
                info.total,
                info.percent_complete(),
                info.backend
            );
        }
    }

    fn on_complete(&self, info: &ProgressInfo) {
        info!(
            "{}: {} units done in {:?} ({})",
            self.title, info.total, info.elapsed, info.backend
        );
    }
}
