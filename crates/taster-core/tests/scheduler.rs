//! Integration tests for the run scheduler with in-memory fakes.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use taster_core::fakes::{FakeRenderer, FakeTaster, ProgressEvent, RecordingProgress};
use taster_core::{
    build_options, generate, CancelSignal, Combination, OptionSchema, RunScheduler,
    SchedulerConfig, Selection, TasterRegistry, TasterStatus,
};

fn combinations(n: usize) -> Vec<Combination> {
    (0..n)
        .map(|i| [("n", i.to_string())].into_iter().collect())
        .collect()
}

fn color_size_combinations() -> Vec<Combination> {
    let schema = OptionSchema::new()
        .with_option("color", ["red", "blue", "green"])
        .with_option("size", ["S", "M"]);
    let selection: Selection = [
        (
            "color".to_string(),
            vec!["red".to_string(), "blue".to_string(), "green".to_string()],
        ),
        ("size".to_string(), vec!["S".to_string(), "M".to_string()]),
    ]
    .into_iter()
    .collect();
    generate(&build_options(&schema, &selection).expect("valid selection"))
}

/// Test: N combinations always yield N runs, each exactly once.
#[tokio::test]
async fn test_every_combination_yields_exactly_one_run() {
    let renderer = Arc::new(FakeRenderer::new("/out"));
    let registry = Arc::new(
        TasterRegistry::new().with(FakeTaster::returning("structure", TasterStatus::Success)),
    );

    let report = RunScheduler::new(SchedulerConfig::with_limit(3))
        .run(combinations(10), renderer.clone(), registry)
        .await
        .expect("run failed");

    assert_eq!(report.runs.len(), 10);
    assert_eq!(report.summary.total, 10);
    let indices: HashSet<usize> = report.runs.iter().map(|r| r.index).collect();
    assert_eq!(indices.len(), 10);
    assert_eq!(renderer.calls(), 10);
    assert!(report.all_passed());
    assert!(!report.cancelled);
}

/// Test: report order equals submission order even when completion order is reversed.
#[tokio::test]
async fn test_report_order_survives_reversed_completion() {
    let n = 5;
    let mut renderer = FakeRenderer::new("/out");
    for i in 0..n {
        renderer = renderer.delaying(i, Duration::from_millis(20 * (n - i) as u64));
    }
    let renderer = Arc::new(renderer);

    let report = RunScheduler::new(SchedulerConfig::with_limit(n))
        .run(combinations(n), renderer.clone(), Arc::new(TasterRegistry::new()))
        .await
        .expect("run failed");

    // Completion really was out of order...
    let completion = renderer.rendered();
    assert_eq!(completion.first(), Some(&(n - 1)));
    assert_eq!(completion.last(), Some(&0));

    // ...but the report is in submission order.
    let order: Vec<usize> = report.runs.iter().map(|r| r.index).collect();
    assert_eq!(order, (0..n).collect::<Vec<_>>());
    for (i, run) in report.runs.iter().enumerate() {
        assert_eq!(run.combination.get("n"), Some(i.to_string().as_str()));
        assert_eq!(run.project_path, Some(renderer.path_for(i)));
    }
}

/// Test: a failed render records the error and runs no tasters.
#[tokio::test]
async fn test_render_failure_skips_tasters() {
    let taster = Arc::new(FakeTaster::returning("structure", TasterStatus::Success));
    let mut registry = TasterRegistry::new();
    registry.register(taster.clone());

    let renderer = Arc::new(FakeRenderer::new("/out").failing_on(1));
    let report = RunScheduler::new(SchedulerConfig::sequential())
        .run(combinations(3), renderer, Arc::new(registry))
        .await
        .expect("run failed");

    let failed = &report.runs[1];
    assert!(failed.render_error.is_some());
    assert!(failed.taster_results.is_empty());
    assert!(failed.project_path.is_none());
    assert!(!failed.passed());

    assert!(report.runs[0].passed());
    assert!(report.runs[2].passed());
    assert_eq!(taster.test_calls(), 2);
    assert_eq!(report.summary.render_errors, 1);
    assert!(!report.all_passed());
}

/// Test: a panicking renderer is contained to its combination.
#[tokio::test]
async fn test_renderer_panic_becomes_render_error() {
    let renderer = Arc::new(FakeRenderer::new("/out").panicking_on(0));
    let report = RunScheduler::new(SchedulerConfig::with_limit(2))
        .run(combinations(2), renderer, Arc::new(TasterRegistry::new()))
        .await
        .expect("run failed");

    let error = report.runs[0].render_error.as_ref().expect("render error recorded");
    assert!(error.message.contains("panicked"));
    assert!(report.runs[1].passed());
}

/// Test: a panicking taster yields ERROR without stopping later tasters or combinations.
#[tokio::test]
async fn test_faulty_taster_is_isolated() {
    let after = Arc::new(FakeTaster::returning("after", TasterStatus::Success));
    let mut registry = TasterRegistry::new().with(FakeTaster::panicking("flaky", "boom"));
    registry.register(after.clone());

    let report = RunScheduler::new(SchedulerConfig::with_limit(2))
        .run(combinations(4), Arc::new(FakeRenderer::new("/out")), Arc::new(registry))
        .await
        .expect("run failed");

    assert_eq!(report.runs.len(), 4);
    for run in &report.runs {
        let statuses: Vec<_> = run.taster_results.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![TasterStatus::Error, TasterStatus::Success]);
    }
    assert_eq!(after.test_calls(), 4);
    assert_eq!(report.summary.statuses.error, 4);
}

/// Test: validators [always FAILURE, always declines] give [FAILURE, SKIPPED] everywhere.
#[tokio::test]
async fn test_failure_then_skipped_scenario() {
    let registry = TasterRegistry::new()
        .with(FakeTaster::returning("strict", TasterStatus::Failure))
        .with(FakeTaster::declining("picky"));
    let combos = color_size_combinations();
    assert_eq!(combos.len(), 6);

    let report = RunScheduler::new(SchedulerConfig::default())
        .run(combos, Arc::new(FakeRenderer::new("/out")), Arc::new(registry))
        .await
        .expect("run failed");

    assert_eq!(report.runs.len(), 6);
    for run in &report.runs {
        let statuses: Vec<_> = run.taster_results.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![TasterStatus::Failure, TasterStatus::Skipped]);
        assert!(!run.passed());
    }
    assert_eq!(report.summary.passed, 0);
    assert_eq!(report.summary.statuses.failure, 6);
    assert_eq!(report.summary.statuses.skipped, 6);
    assert!(!report.all_passed());
}

/// Test: cancelling before the run starts reports every combination as incomplete.
#[tokio::test]
async fn test_cancel_before_start_reports_all_incomplete() {
    let cancel = CancelSignal::new();
    cancel.cancel();
    let renderer = Arc::new(FakeRenderer::new("/out"));

    let report = RunScheduler::new(SchedulerConfig::with_limit(2))
        .with_cancel_signal(cancel)
        .run(combinations(3), renderer.clone(), Arc::new(TasterRegistry::new()))
        .await
        .expect("run failed");

    assert!(report.cancelled);
    assert_eq!(report.runs.len(), 3);
    assert!(report.runs.iter().all(|r| r.incomplete && r.taster_results.is_empty()));
    assert_eq!(renderer.calls(), 0);
    assert_eq!(report.summary.incomplete, 3);
    assert!(!report.all_passed());
}

/// Test: cancelling mid-run lets the in-flight task stop at its next checkpoint.
#[tokio::test]
async fn test_cancel_mid_run_keeps_partial_results() {
    let scheduler = RunScheduler::new(SchedulerConfig::sequential());
    let cancel = scheduler.cancel_signal();

    let second = Arc::new(FakeTaster::returning("second", TasterStatus::Success));
    let mut registry = TasterRegistry::new()
        .with(FakeTaster::returning("first", TasterStatus::Success).cancelling(cancel));
    registry.register(second.clone());

    let renderer = Arc::new(FakeRenderer::new("/out"));
    let report = scheduler
        .run(combinations(3), renderer.clone(), Arc::new(registry))
        .await
        .expect("run failed");

    assert!(report.cancelled);
    assert_eq!(report.runs.len(), 3);

    let first = &report.runs[0];
    assert!(first.incomplete);
    assert_eq!(first.taster_results.len(), 1);
    assert!(first.taster_results[0].is_success());
    assert!(first.project_path.is_some());

    assert!(report.runs[1..].iter().all(|r| r.incomplete && r.taster_results.is_empty()));
    assert_eq!(second.test_calls(), 0);
    assert_eq!(renderer.calls(), 1);
}

/// Test: progress listener sees every start and finalization.
#[tokio::test]
async fn test_progress_events_cover_every_combination() {
    let progress = Arc::new(RecordingProgress::new());
    let report = RunScheduler::new(SchedulerConfig::with_limit(2))
        .with_progress(progress.clone())
        .run(
            combinations(4),
            Arc::new(FakeRenderer::new("/out").failing_on(3)),
            Arc::new(TasterRegistry::new()),
        )
        .await
        .expect("run failed");

    assert_eq!(report.runs.len(), 4);
    let events = progress.events();
    assert_eq!(events.first(), Some(&ProgressEvent::SessionStarted(4)));
    assert_eq!(progress.started(), 4);
    assert_eq!(progress.finalized(), 4);
    assert!(events.contains(&ProgressEvent::RunFinalized {
        index: 3,
        passed: false,
        incomplete: false,
    }));
}

/// Test: the concurrency limit bounds how many combinations run at once.
#[tokio::test]
async fn test_concurrency_limit_is_respected() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct GaugeProgress {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl taster_core::ProgressListener for GaugeProgress {
        fn on_task_started(&self, _index: usize, _combination: &Combination) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn on_run_finalized(&self, _run: &taster_core::CombinationRun) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    let gauge = Arc::new(GaugeProgress {
        current: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let registry = TasterRegistry::new().with(
        FakeTaster::returning("slow", TasterStatus::Success).with_delay(Duration::from_millis(10)),
    );

    RunScheduler::new(SchedulerConfig::with_limit(2))
        .with_progress(gauge.clone())
        .run(combinations(8), Arc::new(FakeRenderer::new("/out")), Arc::new(registry))
        .await
        .expect("run failed");

    assert!(gauge.peak.load(Ordering::SeqCst) <= 2);
    assert!(gauge.peak.load(Ordering::SeqCst) >= 1);
}

/// Test: cancelling during render stops the task before any taster runs.
#[tokio::test]
async fn test_cancel_after_render_keeps_project_but_runs_no_tasters() {
    let scheduler = RunScheduler::new(SchedulerConfig::sequential());
    let renderer = Arc::new(FakeRenderer::new("/out").cancelling(scheduler.cancel_signal()));
    let taster = Arc::new(FakeTaster::returning("structure", TasterStatus::Success));
    let mut registry = TasterRegistry::new();
    registry.register(taster.clone());

    let report = scheduler
        .run(combinations(3), renderer.clone(), Arc::new(registry))
        .await
        .expect("run failed");

    assert!(report.cancelled);
    let first = &report.runs[0];
    assert!(first.incomplete);
    assert_eq!(first.project_path, Some(renderer.path_for(0)));
    assert!(first.taster_results.is_empty());
    assert!(first.render_error.is_none());
    assert_eq!(taster.test_calls(), 0);
    assert_eq!(taster.handle_calls(), 0);
    assert_eq!(renderer.calls(), 1);
    assert!(report.runs[1..].iter().all(|r| r.incomplete && r.project_path.is_none()));
}

/// Test: cancelling as a task starts stops it before render.
#[tokio::test]
async fn test_cancel_at_task_start_skips_render() {
    struct CancelOnStart(CancelSignal);

    impl taster_core::ProgressListener for CancelOnStart {
        fn on_task_started(&self, _index: usize, _combination: &Combination) {
            self.0.cancel();
        }
    }

    let scheduler = RunScheduler::new(SchedulerConfig::sequential());
    let listener = Arc::new(CancelOnStart(scheduler.cancel_signal()));
    let renderer = Arc::new(FakeRenderer::new("/out"));

    let report = scheduler
        .with_progress(listener)
        .run(combinations(2), renderer.clone(), Arc::new(TasterRegistry::new()))
        .await
        .expect("run failed");

    assert!(report.cancelled);
    assert_eq!(report.runs.len(), 2);
    assert!(report.runs.iter().all(|r| r.incomplete && r.project_path.is_none()));
    assert_eq!(renderer.calls(), 0);
}

/// Test: a panicking progress listener does not cost any runs.
#[tokio::test]
async fn test_panicking_progress_listener_keeps_every_run() {
    struct BrokenDisplay;

    impl taster_core::ProgressListener for BrokenDisplay {
        fn on_task_started(&self, index: usize, _combination: &Combination) {
            if index == 1 {
                panic!("display layer bug");
            }
        }

        fn on_run_finalized(&self, run: &taster_core::CombinationRun) {
            if run.index == 2 {
                panic!("display layer bug");
            }
        }
    }

    let report = RunScheduler::new(SchedulerConfig::with_limit(2))
        .with_progress(Arc::new(BrokenDisplay))
        .run(
            combinations(4),
            Arc::new(FakeRenderer::new("/out")),
            Arc::new(TasterRegistry::new().with(FakeTaster::returning("structure", TasterStatus::Success))),
        )
        .await
        .expect("listener panics must not abort the run");

    assert_eq!(report.runs.len(), 4);
    assert!(report.runs.iter().all(|r| r.passed()));
    assert!(report.all_passed());
}
