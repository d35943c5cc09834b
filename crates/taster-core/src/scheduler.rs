//! Bounded-concurrency execution of combinations.
//!
//! Each combination is one tokio task: render, then dispatch tasters, then
//! record. A semaphore caps the number of tasks in flight. Cancellation is
//! cooperative: no new task starts once the signal fires, and running tasks
//! stop at their next checkpoint (before render, after render, or between
//! tasters).

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, Instrument};
use uuid::Uuid;

use crate::aggregator::{CombinationRun, ResultAggregator, RunReport};
use crate::cancel::CancelSignal;
use crate::combinations::Combination;
use crate::dispatch::{dispatch_until_cancelled, panic_message};
use crate::error::{Result, TasterError};
use crate::obs;
use crate::progress::{NoopProgress, ProgressListener};
use crate::render::{ProjectRenderer, RenderError};
use crate::taster::TasterRegistry;

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum number of combinations in flight. Must be at least 1.
    pub concurrency_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl SchedulerConfig {
    pub fn with_limit(concurrency_limit: usize) -> Self {
        Self { concurrency_limit }
    }

    /// One combination at a time, in submission order.
    pub fn sequential() -> Self {
        Self::with_limit(1)
    }
}

/// Runs every combination through render and taster dispatch.
pub struct RunScheduler {
    config: SchedulerConfig,
    progress: Arc<dyn ProgressListener>,
    cancel: CancelSignal,
}

impl RunScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            progress: Arc::new(NoopProgress),
            cancel: CancelSignal::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressListener>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle for cancelling this scheduler's runs.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Execute every combination and return the ordered report.
    ///
    /// Per-combination and per-taster failures are recorded in the report.
    /// `Err` is reserved for session-level faults: a zero concurrency limit,
    /// a worker task that could not be joined, or a broken aggregation
    /// invariant.
    pub async fn run(
        &self,
        combinations: Vec<Combination>,
        renderer: Arc<dyn ProjectRenderer>,
        registry: Arc<TasterRegistry>,
    ) -> Result<RunReport> {
        if self.config.concurrency_limit == 0 {
            return Err(TasterError::Scheduler(
                "concurrency limit must be at least 1".to_string(),
            ));
        }

        let run_id = Uuid::new_v4().to_string();
        let span = obs::run_span(&run_id);
        self.run_session(run_id, combinations, renderer, registry)
            .instrument(span)
            .await
    }

    async fn run_session(
        &self,
        run_id: String,
        combinations: Vec<Combination>,
        renderer: Arc<dyn ProjectRenderer>,
        registry: Arc<TasterRegistry>,
    ) -> Result<RunReport> {
        let total = combinations.len();
        let limit = self.config.concurrency_limit;
        obs::emit_run_started(&run_id, total, limit);
        notify("on_session_started", || self.progress.on_session_started(total));

        let aggregator = Arc::new(ResultAggregator::new(&combinations));
        let semaphore = Arc::new(Semaphore::new(limit));
        let mut workers = JoinSet::new();

        for (index, combination) in combinations.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => Some(permit.map_err(|e| {
                    TasterError::Scheduler(format!("worker pool closed: {e}"))
                })?),
            };

            let Some(permit) = permit else {
                debug!(index, "cancelled before start");
                let run = CombinationRun::cancelled(index, combination);
                finish(&*self.progress, &aggregator, run).await?;
                continue;
            };

            let aggregator = Arc::clone(&aggregator);
            let renderer = Arc::clone(&renderer);
            let registry = Arc::clone(&registry);
            let progress = Arc::clone(&self.progress);
            let cancel = self.cancel.clone();

            workers.spawn(
                async move {
                    let _permit = permit;
                    notify("on_task_started", || progress.on_task_started(index, &combination));
                    let run =
                        execute_combination(index, combination, &*renderer, &registry, &cancel)
                            .await;
                    finish(&*progress, &aggregator, run).await
                }
                .in_current_span(),
            );
        }

        while let Some(joined) = workers.join_next().await {
            joined.map_err(|e| TasterError::Scheduler(format!("worker task failed: {e}")))??;
        }

        let cancelled = self.cancel.is_cancelled();
        let report = aggregator.finalize(run_id.as_str(), cancelled).await;
        obs::emit_run_finished(&run_id, &report.summary, report.duration_ms(), cancelled);
        if cancelled {
            info!(
                incomplete = report.summary.incomplete,
                "session cancelled; incomplete combinations are reported"
            );
        }
        Ok(report)
    }
}

/// Record `run`, then tell the listener. The run is kept even if the
/// listener panics.
async fn finish(
    progress: &dyn ProgressListener,
    aggregator: &ResultAggregator,
    run: CombinationRun,
) -> Result<()> {
    obs::emit_combination_finished(&run);
    aggregator.record(run.clone()).await?;
    notify("on_run_finalized", || progress.on_run_finalized(&run));
    Ok(())
}

/// Invoke a progress callback, downgrading a panic to a warning.
fn notify(callback: &str, f: impl FnOnce()) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(f)) {
        obs::emit_progress_fault(callback, &panic_message(panic.as_ref()));
    }
}

/// One combination's task body. Never fails: every outcome is a run.
async fn execute_combination(
    index: usize,
    combination: Combination,
    renderer: &dyn ProjectRenderer,
    registry: &TasterRegistry,
    cancel: &CancelSignal,
) -> CombinationRun {
    let start = Instant::now();
    if cancel.is_cancelled() {
        return CombinationRun::cancelled(index, combination);
    }

    let rendered = match AssertUnwindSafe(renderer.render(index, &combination))
        .catch_unwind()
        .await
    {
        Ok(rendered) => rendered,
        Err(panic) => Err(RenderError::new(format!(
            "renderer panicked: {}",
            panic_message(panic.as_ref())
        ))),
    };

    let project = match rendered {
        Ok(project) => project,
        Err(error) => {
            obs::emit_render_failed(index, &error);
            let duration_ms = start.elapsed().as_millis() as u64;
            return CombinationRun::render_failed(index, combination, error, duration_ms);
        }
    };

    if cancel.is_cancelled() {
        let mut run = CombinationRun::cancelled(index, combination);
        run.project_path = Some(project.path);
        run.duration_ms = start.elapsed().as_millis() as u64;
        return run;
    }

    let outcome = dispatch_until_cancelled(&project, registry, cancel).await;
    let mut run = CombinationRun::completed(
        index,
        combination,
        project.path,
        outcome.results,
        start.elapsed().as_millis() as u64,
    );
    run.incomplete = outcome.interrupted;
    run
}
