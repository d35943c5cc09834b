//! The taster plugin contract and the ordered taster registry.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::combinations::Combination;

/// Outcome of a single taster on a single project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TasterStatus {
    /// The project passed the taster's check.
    Success,
    /// The taster ran and found the project non-conforming.
    Failure,
    /// The taster declined to handle the project.
    Skipped,
    /// The taster itself malfunctioned.
    Error,
}

impl TasterStatus {
    pub const ALL: [TasterStatus; 4] = [
        TasterStatus::Success,
        TasterStatus::Failure,
        TasterStatus::Skipped,
        TasterStatus::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TasterStatus::Success => "success",
            TasterStatus::Failure => "failure",
            TasterStatus::Skipped => "skipped",
            TasterStatus::Error => "error",
        }
    }

    /// Success and Skipped never fail a combination.
    pub fn is_passing(&self) -> bool {
        matches!(self, TasterStatus::Success | TasterStatus::Skipped)
    }
}

impl fmt::Display for TasterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a template came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMetadata {
    /// Original template source (URL or path).
    pub source: String,
    pub name: Option<String>,
    pub version: Option<String>,
}

impl TemplateMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name: None,
            version: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// What a taster sees when deciding whether it applies to a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TasterContext {
    pub combination: Combination,
    pub template: TemplateMetadata,
}

impl TasterContext {
    /// Resolved value of `option` for this project.
    pub fn value(&self, option: &str) -> Option<&str> {
        self.combination.get(option)
    }
}

/// A materialized project handed to tasters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub path: PathBuf,
    /// The rendering context that produced this project.
    pub combination: Combination,
    pub template: TemplateMetadata,
}

impl ProjectInfo {
    pub fn new(path: impl Into<PathBuf>, combination: Combination, template: TemplateMetadata) -> Self {
        Self {
            path: path.into(),
            combination,
            template,
        }
    }

    pub fn taster_context(&self) -> TasterContext {
        TasterContext {
            combination: self.combination.clone(),
            template: self.template.clone(),
        }
    }
}

/// Structured outcome reported by one taster for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasterResult {
    pub taster_name: String,
    pub status: TasterStatus,
    /// Human-readable detail; may be empty.
    #[serde(default)]
    pub message: String,
    /// Detailed log lines from the taster run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl TasterResult {
    pub fn new(taster_name: impl Into<String>, status: TasterStatus, message: impl Into<String>) -> Self {
        Self {
            taster_name: taster_name.into(),
            status,
            message: message.into(),
            logs: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn success(taster_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(taster_name, TasterStatus::Success, message)
    }

    pub fn failure(taster_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(taster_name, TasterStatus::Failure, message)
    }

    /// Skipped results carry no message.
    pub fn skipped(taster_name: impl Into<String>) -> Self {
        Self::new(taster_name, TasterStatus::Skipped, "")
    }

    pub fn error(taster_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(taster_name, TasterStatus::Error, message)
    }

    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.logs = logs;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == TasterStatus::Success
    }

    pub fn is_failure(&self) -> bool {
        self.status == TasterStatus::Failure
    }

    pub fn is_skipped(&self) -> bool {
        self.status == TasterStatus::Skipped
    }

    pub fn is_error(&self) -> bool {
        self.status == TasterStatus::Error
    }
}

/// A pluggable validator run against generated projects.
///
/// `can_handle` decides applicability from the resolved options alone;
/// `test_project` inspects the materialized project and must report
/// [`TasterStatus::Success`] or [`TasterStatus::Failure`]. Returning `Err`
/// (or panicking) from either method is recorded as [`TasterStatus::Error`]
/// by the dispatcher.
#[async_trait]
pub trait Taster: Send + Sync {
    /// Stable, human-readable taster name.
    fn name(&self) -> &str;

    fn can_handle(&self, context: &TasterContext) -> anyhow::Result<bool>;

    async fn test_project(&self, project: &ProjectInfo) -> anyhow::Result<TasterResult>;
}

/// Ordered, append-only collection of tasters.
///
/// Populated before a run and shared read-only across workers; registration
/// order is invocation order.
#[derive(Clone, Default)]
pub struct TasterRegistry {
    tasters: Vec<Arc<dyn Taster>>,
}

impl TasterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, taster: Arc<dyn Taster>) {
        self.tasters.push(taster);
    }

    /// Builder form of [`TasterRegistry::register`].
    pub fn with(mut self, taster: impl Taster + 'static) -> Self {
        self.register(Arc::new(taster));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Taster>> {
        self.tasters.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.tasters.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tasters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasters.is_empty()
    }
}

impl fmt::Debug for TasterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TasterRegistry")
            .field("tasters", &self.names())
            .finish()
    }
}
