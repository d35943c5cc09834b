//! Progress callbacks for presentation layers.

use crate::aggregator::CombinationRun;
use crate::combinations::Combination;

/// Observer notified as the scheduler works through combinations.
///
/// Called from worker tasks, possibly concurrently. All methods default to
/// no-ops.
pub trait ProgressListener: Send + Sync {
    fn on_session_started(&self, _total: usize) {}

    fn on_task_started(&self, _index: usize, _combination: &Combination) {}

    fn on_run_finalized(&self, _run: &CombinationRun) {}
}

/// Listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressListener for NoopProgress {}
