//! Cookie Taster Core
//!
//! Exhaustively tests a cookiecutter-style template:
//! - Builds validated option sets from a template schema and a user selection
//! - Expands them into every combination (leftmost option varies slowest)
//! - Renders and tastes each combination on a bounded worker pool
//! - Aggregates per-combination outcomes into an ordered report

pub mod aggregator;
pub mod cancel;
pub mod combinations;
pub mod dispatch;
pub mod error;
pub mod fakes;
pub mod obs;
pub mod options;
pub mod progress;
pub mod render;
pub mod reporting;
pub mod scheduler;
pub mod taster;
pub mod telemetry;

// Re-export key types
pub use aggregator::{CombinationRun, ResultAggregator, RunReport, RunSummary, StatusCounts};
pub use cancel::CancelSignal;
pub use combinations::{combination_count, generate, Combination};
pub use dispatch::{dispatch, dispatch_until_cancelled, DispatchOutcome};
pub use error::{InvalidSelection, Result, TasterError};
pub use options::{build_options, select_all, OptionSchema, SchemaEntry, Selection, TemplateOption};
pub use progress::{NoopProgress, ProgressListener};
pub use render::{ProjectRenderer, RenderError};
pub use scheduler::{RunScheduler, SchedulerConfig};
pub use taster::{
    ProjectInfo, Taster, TasterContext, TasterRegistry, TasterResult, TasterStatus,
    TemplateMetadata,
};
pub use telemetry::init_tracing;
