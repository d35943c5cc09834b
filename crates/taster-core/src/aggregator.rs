//! Per-combination outcomes and their ordered aggregation into a report.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use crate::combinations::Combination;
use crate::error::{Result, TasterError};
use crate::render::RenderError;
use crate::taster::{TasterResult, TasterStatus};

/// Finalized outcome of one combination's task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationRun {
    /// Submission position of the combination.
    pub index: usize,
    pub combination: Combination,
    /// Location of the rendered project, when rendering succeeded.
    pub project_path: Option<PathBuf>,
    /// Set iff materialization failed; no tasters ran in that case.
    pub render_error: Option<RenderError>,
    /// Taster results in registry order.
    pub taster_results: Vec<TasterResult>,
    /// Cancellation interrupted or prevented this task.
    pub incomplete: bool,
    pub duration_ms: u64,
}

impl CombinationRun {
    pub fn completed(
        index: usize,
        combination: Combination,
        project_path: PathBuf,
        taster_results: Vec<TasterResult>,
        duration_ms: u64,
    ) -> Self {
        Self {
            index,
            combination,
            project_path: Some(project_path),
            render_error: None,
            taster_results,
            incomplete: false,
            duration_ms,
        }
    }

    pub fn render_failed(
        index: usize,
        combination: Combination,
        error: RenderError,
        duration_ms: u64,
    ) -> Self {
        Self {
            index,
            combination,
            project_path: None,
            render_error: Some(error),
            taster_results: Vec::new(),
            incomplete: false,
            duration_ms,
        }
    }

    /// A run that cancellation stopped before any taster ran.
    pub fn cancelled(index: usize, combination: Combination) -> Self {
        Self {
            index,
            combination,
            project_path: None,
            render_error: None,
            taster_results: Vec::new(),
            incomplete: true,
            duration_ms: 0,
        }
    }

    /// No render error, not interrupted, and every taster passed or skipped.
    pub fn passed(&self) -> bool {
        self.render_error.is_none()
            && !self.incomplete
            && self.taster_results.iter().all(|r| r.status.is_passing())
    }

    /// Taster results that count against this combination.
    pub fn failing_results(&self) -> impl Iterator<Item = &TasterResult> {
        self.taster_results.iter().filter(|r| !r.status.is_passing())
    }
}

/// Taster result counts keyed by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub success: usize,
    pub failure: usize,
    pub skipped: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: TasterStatus) {
        match status {
            TasterStatus::Success => self.success += 1,
            TasterStatus::Failure => self.failure += 1,
            TasterStatus::Skipped => self.skipped += 1,
            TasterStatus::Error => self.error += 1,
        }
    }

    pub fn get(&self, status: TasterStatus) -> usize {
        match status {
            TasterStatus::Success => self.success,
            TasterStatus::Failure => self.failure,
            TasterStatus::Skipped => self.skipped,
            TasterStatus::Error => self.error,
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.failure + self.skipped + self.error
    }
}

/// Derived counts over a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub render_errors: usize,
    pub incomplete: usize,
    pub statuses: StatusCounts,
}

impl RunSummary {
    pub fn from_runs(runs: &[CombinationRun]) -> Self {
        let mut summary = RunSummary {
            total: runs.len(),
            ..Default::default()
        };
        for run in runs {
            if run.passed() {
                summary.passed += 1;
            } else {
                summary.failed += 1;
            }
            if run.render_error.is_some() {
                summary.render_errors += 1;
            }
            if run.incomplete {
                summary.incomplete += 1;
            }
            for result in &run.taster_results {
                summary.statuses.add(result.status);
            }
        }
        summary
    }
}

/// Outcome of a whole session, in combination submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// The session was cancelled before every combination completed.
    pub cancelled: bool,
    pub runs: Vec<CombinationRun>,
    pub summary: RunSummary,
}

impl RunReport {
    /// Every combination passed. This drives the process exit status.
    pub fn all_passed(&self) -> bool {
        self.runs.iter().all(CombinationRun::passed)
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

/// Concurrent sink for finalized runs.
///
/// Slots are pre-sized to the combination count and written by index, so
/// completion order never affects report order.
#[derive(Debug)]
pub struct ResultAggregator {
    combinations: Vec<Combination>,
    slots: Mutex<Vec<Option<CombinationRun>>>,
    started_at: DateTime<Utc>,
}

impl ResultAggregator {
    pub fn new(combinations: &[Combination]) -> Self {
        Self {
            combinations: combinations.to_vec(),
            slots: Mutex::new(vec![None; combinations.len()]),
            started_at: Utc::now(),
        }
    }

    /// Store a finalized run in its submission slot.
    ///
    /// Fails if the index is out of range or the slot was already recorded.
    pub async fn record(&self, run: CombinationRun) -> Result<()> {
        let mut slots = self.slots.lock().await;
        let index = run.index;
        let slot = slots.get_mut(index).ok_or_else(|| {
            TasterError::Scheduler(format!(
                "run index {index} out of range for {} combinations",
                self.combinations.len()
            ))
        })?;
        if slot.is_some() {
            return Err(TasterError::Scheduler(format!(
                "combination {index} was recorded twice"
            )));
        }
        *slot = Some(run);
        Ok(())
    }

    /// Number of runs recorded so far.
    pub async fn recorded(&self) -> usize {
        self.slots.lock().await.iter().filter(|s| s.is_some()).count()
    }

    /// Drain the slots into a report.
    ///
    /// Slots never recorded become incomplete runs, so the report always
    /// covers every combination exactly once.
    pub async fn finalize(&self, run_id: impl Into<String>, cancelled: bool) -> RunReport {
        let slots = std::mem::take(&mut *self.slots.lock().await);
        let runs: Vec<CombinationRun> = slots
            .into_iter()
            .zip(&self.combinations)
            .enumerate()
            .map(|(index, (slot, combination))| {
                slot.unwrap_or_else(|| {
                    warn!(index, "combination finished without a recorded run");
                    CombinationRun::cancelled(index, combination.clone())
                })
            })
            .collect();

        RunReport {
            run_id: run_id.into(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            cancelled,
            summary: RunSummary::from_runs(&runs),
            runs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combo(i: usize) -> Combination {
        [("n", i.to_string())].into_iter().collect()
    }

    fn combos(n: usize) -> Vec<Combination> {
        (0..n).map(combo).collect()
    }

    #[test]
    fn test_skipped_is_neutral_for_overall_pass() {
        let run = CombinationRun::completed(
            0,
            combo(0),
            PathBuf::from("/p"),
            vec![
                TasterResult::success("a", ""),
                TasterResult::skipped("b"),
            ],
            1,
        );
        assert!(run.passed());
        assert_eq!(run.failing_results().count(), 0);
    }

    #[test]
    fn test_failure_error_render_and_incomplete_all_fail() {
        let failing = CombinationRun::completed(
            0,
            combo(0),
            PathBuf::from("/p"),
            vec![TasterResult::failure("a", "nope")],
            1,
        );
        let erroring = CombinationRun::completed(
            1,
            combo(1),
            PathBuf::from("/p"),
            vec![TasterResult::error("a", "crash")],
            1,
        );
        let unrendered = CombinationRun::render_failed(2, combo(2), RenderError::new("bad"), 1);
        let cancelled = CombinationRun::cancelled(3, combo(3));
        for run in [failing, erroring, unrendered, cancelled] {
            assert!(!run.passed(), "{run:?} should not pass");
        }
    }

    #[tokio::test]
    async fn test_finalize_restores_submission_order() {
        let aggregator = ResultAggregator::new(&combos(3));
        for i in [2, 0, 1] {
            aggregator
                .record(CombinationRun::completed(i, combo(i), PathBuf::from("/p"), vec![], 1))
                .await
                .unwrap();
        }
        let report = aggregator.finalize("run-1", false).await;
        let order: Vec<usize> = report.runs.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert!(report.all_passed());
        assert_eq!(report.summary.total, 3);
    }

    #[tokio::test]
    async fn test_duplicate_and_out_of_range_records_rejected() {
        let aggregator = ResultAggregator::new(&combos(1));
        aggregator.record(CombinationRun::cancelled(0, combo(0))).await.unwrap();
        assert!(aggregator.record(CombinationRun::cancelled(0, combo(0))).await.is_err());
        assert!(aggregator.record(CombinationRun::cancelled(5, combo(5))).await.is_err());
        assert_eq!(aggregator.recorded().await, 1);
    }

    #[tokio::test]
    async fn test_missing_slots_become_incomplete_runs() {
        let aggregator = ResultAggregator::new(&combos(2));
        aggregator
            .record(CombinationRun::completed(1, combo(1), PathBuf::from("/p"), vec![], 1))
            .await
            .unwrap();
        let report = aggregator.finalize("run-2", true).await;
        assert_eq!(report.runs.len(), 2);
        assert!(report.runs[0].incomplete);
        assert_eq!(report.runs[0].combination, combo(0));
        assert_eq!(report.summary.incomplete, 1);
        assert!(!report.all_passed());
    }

    #[test]
    fn test_summary_counts() {
        let runs = vec![
            CombinationRun::completed(
                0,
                combo(0),
                PathBuf::from("/p"),
                vec![TasterResult::failure("a", ""), TasterResult::skipped("b")],
                1,
            ),
            CombinationRun::completed(
                1,
                combo(1),
                PathBuf::from("/p"),
                vec![TasterResult::success("a", ""), TasterResult::error("b", "x")],
                1,
            ),
            CombinationRun::render_failed(2, combo(2), RenderError::new("bad"), 1),
            CombinationRun::completed(3, combo(3), PathBuf::from("/p"), vec![TasterResult::success("a", "")], 1),
        ];
        let summary = RunSummary::from_runs(&runs);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.render_errors, 1);
        assert_eq!(summary.statuses.get(TasterStatus::Success), 2);
        assert_eq!(summary.statuses.failure, 1);
        assert_eq!(summary.statuses.skipped, 1);
        assert_eq!(summary.statuses.error, 1);
        assert_eq!(summary.statuses.total(), 5);
    }
}
