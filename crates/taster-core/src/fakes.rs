//! In-memory fakes for the collaborator traits (testing only)
//!
//! Provides `FakeTaster`, `FakeRenderer`, and `RecordingProgress` that satisfy
//! the trait contracts without touching the filesystem or spawning processes.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::aggregator::CombinationRun;
use crate::cancel::CancelSignal;
use crate::combinations::Combination;
use crate::progress::ProgressListener;
use crate::render::{ProjectRenderer, RenderError};
use crate::taster::{ProjectInfo, Taster, TasterContext, TasterResult, TasterStatus, TemplateMetadata};

// ---------------------------------------------------------------------------
// FakeTaster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Behavior {
    Return(TasterStatus),
    Fail(String),
    Panic(String),
}

/// Scriptable taster that counts how often it is consulted.
#[derive(Debug)]
pub struct FakeTaster {
    name: String,
    handles: bool,
    condition: Option<(String, String)>,
    check_panics: Option<String>,
    behavior: Behavior,
    cancels: Option<CancelSignal>,
    delay: Option<Duration>,
    handle_calls: AtomicUsize,
    test_calls: AtomicUsize,
}

impl FakeTaster {
    fn with_behavior(name: &str, handles: bool, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            handles,
            condition: None,
            check_panics: None,
            behavior,
            cancels: None,
            delay: None,
            handle_calls: AtomicUsize::new(0),
            test_calls: AtomicUsize::new(0),
        }
    }

    /// Handles every project and reports `status`.
    pub fn returning(name: &str, status: TasterStatus) -> Self {
        Self::with_behavior(name, true, Behavior::Return(status))
    }

    /// Declines every project.
    pub fn declining(name: &str) -> Self {
        Self::with_behavior(name, false, Behavior::Return(TasterStatus::Success))
    }

    /// Handles every project and returns `Err(message)`.
    pub fn erroring(name: &str, message: &str) -> Self {
        Self::with_behavior(name, true, Behavior::Fail(message.to_string()))
    }

    /// Handles every project and panics with `message`.
    pub fn panicking(name: &str, message: &str) -> Self {
        Self::with_behavior(name, true, Behavior::Panic(message.to_string()))
    }

    /// Panics inside `can_handle`.
    pub fn panicking_on_check(name: &str, message: &str) -> Self {
        let mut taster = Self::returning(name, TasterStatus::Success);
        taster.check_panics = Some(message.to_string());
        taster
    }

    /// Only handle projects where `option == value`.
    pub fn only_when(mut self, option: &str, value: &str) -> Self {
        self.condition = Some((option.to_string(), value.to_string()));
        self
    }

    /// Fire `signal` from inside `test_project`.
    pub fn cancelling(mut self, signal: CancelSignal) -> Self {
        self.cancels = Some(signal);
        self
    }

    /// Sleep inside `test_project`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn handle_calls(&self) -> usize {
        self.handle_calls.load(Ordering::SeqCst)
    }

    pub fn test_calls(&self) -> usize {
        self.test_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Taster for FakeTaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_handle(&self, context: &TasterContext) -> anyhow::Result<bool> {
        self.handle_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.check_panics {
            panic!("{}", message);
        }
        let matches = match &self.condition {
            Some((option, value)) => context.value(option) == Some(value.as_str()),
            None => true,
        };
        Ok(self.handles && matches)
    }

    async fn test_project(&self, _project: &ProjectInfo) -> anyhow::Result<TasterResult> {
        self.test_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(signal) = &self.cancels {
            signal.cancel();
        }
        match &self.behavior {
            Behavior::Return(status) => Ok(TasterResult::new(&self.name, *status, "")),
            Behavior::Fail(message) => Err(anyhow::anyhow!("{}", message)),
            Behavior::Panic(message) => panic!("{}", message),
        }
    }
}

// ---------------------------------------------------------------------------
// FakeRenderer
// ---------------------------------------------------------------------------

/// Renderer that "materializes" combination `i` at `<root>/combo-<i>` without
/// writing anything.
pub struct FakeRenderer {
    root: PathBuf,
    template: TemplateMetadata,
    fail_on: HashSet<usize>,
    panic_on: HashSet<usize>,
    delays: HashMap<usize, Duration>,
    cancels: Option<CancelSignal>,
    calls: AtomicUsize,
    rendered: Mutex<Vec<usize>>,
}

impl FakeRenderer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            template: TemplateMetadata::new("fake-template"),
            fail_on: HashSet::new(),
            panic_on: HashSet::new(),
            delays: HashMap::new(),
            cancels: None,
            calls: AtomicUsize::new(0),
            rendered: Mutex::new(Vec::new()),
        }
    }

    /// Return a `RenderError` for combination `index`.
    pub fn failing_on(mut self, index: usize) -> Self {
        self.fail_on.insert(index);
        self
    }

    /// Panic while rendering combination `index`.
    pub fn panicking_on(mut self, index: usize) -> Self {
        self.panic_on.insert(index);
        self
    }

    /// Sleep for `delay` before rendering combination `index`.
    pub fn delaying(mut self, index: usize, delay: Duration) -> Self {
        self.delays.insert(index, delay);
        self
    }

    /// Fire `signal` after each successful render.
    pub fn cancelling(mut self, signal: CancelSignal) -> Self {
        self.cancels = Some(signal);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Indices rendered successfully, in completion order.
    pub fn rendered(&self) -> Vec<usize> {
        self.rendered.lock().unwrap().clone()
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.root.join(format!("combo-{index:04}"))
    }
}

#[async_trait]
impl ProjectRenderer for FakeRenderer {
    async fn render(&self, index: usize, combination: &Combination) -> Result<ProjectInfo, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&index) {
            tokio::time::sleep(*delay).await;
        }
        if self.panic_on.contains(&index) {
            panic!("fake renderer exploded on {index}");
        }
        if self.fail_on.contains(&index) {
            return Err(RenderError::new(format!("fake render failure for {index}")));
        }
        self.rendered.lock().unwrap().push(index);
        if let Some(signal) = &self.cancels {
            signal.cancel();
        }
        Ok(ProjectInfo::new(
            self.path_for(index),
            combination.clone(),
            self.template.clone(),
        ))
    }
}

// ---------------------------------------------------------------------------
// RecordingProgress
// ---------------------------------------------------------------------------

/// A progress notification captured by [`RecordingProgress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    SessionStarted(usize),
    TaskStarted(usize),
    RunFinalized { index: usize, passed: bool, incomplete: bool },
}

/// Progress listener that records every callback.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn started(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::TaskStarted(_)))
            .count()
    }

    pub fn finalized(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::RunFinalized { .. }))
            .count()
    }
}

impl ProgressListener for RecordingProgress {
    fn on_session_started(&self, total: usize) {
        self.events.lock().unwrap().push(ProgressEvent::SessionStarted(total));
    }

    fn on_task_started(&self, index: usize, _combination: &Combination) {
        self.events.lock().unwrap().push(ProgressEvent::TaskStarted(index));
    }

    fn on_run_finalized(&self, run: &CombinationRun) {
        self.events.lock().unwrap().push(ProgressEvent::RunFinalized {
            index: run.index,
            passed: run.passed(),
            incomplete: run.incomplete,
        });
    }
}
