//! Taster dispatch for a single generated project.
//!
//! Every call into a taster is captured here: returned errors and panics both
//! become [`TasterStatus::Error`] results, so a faulty taster never escapes
//! into the scheduler.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use futures::FutureExt;
use tracing::debug;

use crate::cancel::CancelSignal;
use crate::obs;
use crate::taster::{ProjectInfo, Taster, TasterContext, TasterRegistry, TasterResult, TasterStatus};

/// Results of dispatching a registry against one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// One result per taster reached, in registry order.
    pub results: Vec<TasterResult>,
    /// Cancellation stopped dispatch before every taster ran.
    pub interrupted: bool,
}

/// Run every registered taster against `project`, in registry order.
///
/// Always yields exactly `registry.len()` results.
pub async fn dispatch(project: &ProjectInfo, registry: &TasterRegistry) -> Vec<TasterResult> {
    dispatch_until_cancelled(project, registry, &CancelSignal::new())
        .await
        .results
}

/// Like [`dispatch`], but checks `cancel` before starting each taster.
pub async fn dispatch_until_cancelled(
    project: &ProjectInfo,
    registry: &TasterRegistry,
    cancel: &CancelSignal,
) -> DispatchOutcome {
    let context = project.taster_context();
    let mut results = Vec::with_capacity(registry.len());

    for taster in registry.iter() {
        if cancel.is_cancelled() {
            debug!(
                completed = results.len(),
                total = registry.len(),
                "dispatch interrupted by cancellation"
            );
            return DispatchOutcome {
                results,
                interrupted: true,
            };
        }
        results.push(taste(taster.as_ref(), project, &context).await);
    }

    DispatchOutcome {
        results,
        interrupted: false,
    }
}

async fn taste(taster: &dyn Taster, project: &ProjectInfo, context: &TasterContext) -> TasterResult {
    let name = taster.name().to_string();
    let start = Instant::now();

    let handles = match catch_unwind(AssertUnwindSafe(|| taster.can_handle(context))) {
        Ok(Ok(handles)) => handles,
        Ok(Err(e)) => {
            return fault(&name, format!("can_handle failed: {e:#}"), start);
        }
        Err(panic) => {
            return fault(
                &name,
                format!("can_handle panicked: {}", panic_message(panic.as_ref())),
                start,
            );
        }
    };

    if !handles {
        debug!(taster = %name, path = %project.path.display(), "taster declined project");
        return TasterResult::skipped(name);
    }

    match AssertUnwindSafe(taster.test_project(project))
        .catch_unwind()
        .await
    {
        Ok(Ok(result)) => match result.status {
            TasterStatus::Success | TasterStatus::Failure => result,
            other => {
                let detail = format!(
                    "taster returned status '{other}' from test_project; expected success or failure"
                );
                obs::emit_taster_fault(&name, &detail);
                let mut normalized = TasterResult::error(name, detail).with_logs(result.logs);
                normalized.duration_ms = elapsed_ms(start);
                normalized
            }
        },
        Ok(Err(e)) => fault(&name, format!("test_project failed: {e:#}"), start),
        Err(panic) => fault(
            &name,
            format!("test_project panicked: {}", panic_message(panic.as_ref())),
            start,
        ),
    }
}

fn fault(name: &str, detail: String, start: Instant) -> TasterResult {
    obs::emit_taster_fault(name, &detail);
    TasterResult::error(name, detail).with_duration_ms(elapsed_ms(start))
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
