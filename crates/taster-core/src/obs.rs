//! Structured observability hooks for taster sessions.
//!
//! Every lifecycle event carries an `event` field so log pipelines can filter
//! on it. Verbosity follows `RUST_LOG` (see [`crate::init_tracing`]).

use tracing::{info, warn};

use crate::aggregator::{CombinationRun, RunSummary};

/// Span tagging everything inside one scheduler session with its run id.
///
/// Attach it with `Instrument::instrument` rather than entering it, so the
/// session future stays `Send`.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("taster.run", run_id = %run_id)
}

/// Emit event: session started.
pub fn emit_run_started(run_id: &str, combinations: usize, concurrency_limit: usize) {
    info!(
        event = "run.started",
        run_id = %run_id,
        combinations = combinations,
        concurrency_limit = concurrency_limit,
    );
}

/// Emit event: one combination's run was finalized.
pub fn emit_combination_finished(run: &CombinationRun) {
    info!(
        event = "combination.finished",
        index = run.index,
        combination = %run.combination,
        passed = run.passed(),
        incomplete = run.incomplete,
        tasters = run.taster_results.len(),
        duration_ms = run.duration_ms,
    );
}

/// Emit event: a combination could not be rendered (warning level).
pub fn emit_render_failed(index: usize, error: &dyn std::fmt::Display) {
    warn!(event = "combination.render_failed", index = index, error = %error);
}

/// Emit event: a taster faulted or broke its contract (warning level).
pub fn emit_taster_fault(taster: &str, detail: &str) {
    warn!(event = "taster.fault", taster = %taster, detail = %detail);
}

/// Emit event: a progress listener panicked (warning level).
pub fn emit_progress_fault(callback: &str, detail: &str) {
    warn!(event = "progress.fault", callback = %callback, detail = %detail);
}

/// Emit event: session finished.
pub fn emit_run_finished(run_id: &str, summary: &RunSummary, duration_ms: u64, cancelled: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        render_errors = summary.render_errors,
        incomplete = summary.incomplete,
        cancelled = cancelled,
        duration_ms = duration_ms,
    );
}
