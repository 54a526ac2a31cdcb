//! Progress reporting for long-running dispatch loops.

use parking_lot::Mutex;
use std::sync::Arc;

/// One progress event emitted by a convergence loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    /// The loop started dispatching the named operation.
    Started { op: String },
    /// One full dispatch round finished.
    IterationCompleted { iteration: usize, changed: i64 },
    /// The loop terminated because a round reported no change.
    Converged { iterations: usize, total_changed: i64 },
}

/// Callback invoked after every progress event.
pub type ProgressCallback = Box<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// Collects progress updates, for tests and post-run inspection.
#[derive(Debug, Clone, Default)]
pub struct ProgressLog {
    updates: Arc<Mutex<Vec<ProgressUpdate>>>,
}

impl ProgressLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that appends every update to this log.
    pub fn callback(&self) -> ProgressCallback {
        let updates = Arc::clone(&self.updates);
        Box::new(move |u| updates.lock().push(u.clone()))
    }

    /// Snapshot of the updates recorded so far.
    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().clone()
    }
}
