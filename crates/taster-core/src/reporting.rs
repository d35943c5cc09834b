//! Report artifacts for CLI consumers.
//!
//! - `render_text`: human-readable per-combination summary for the terminal
//! - `write_json`: machine-readable `RunReport` (report.json)

use std::fmt::Write as _;
use std::path::Path;

use crate::aggregator::{CombinationRun, RunReport};
use crate::error::Result;

/// Render `report` as plain text, one line per combination plus a summary.
pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Run {}", report.run_id);
    if report.cancelled {
        let _ = writeln!(out, "(cancelled; incomplete combinations are marked)");
    }
    out.push('\n');

    for run in &report.runs {
        let _ = writeln!(out, "{} #{:<4} {}", marker(run), run.index, run.combination);
        if let Some(error) = &run.render_error {
            let _ = writeln!(out, "      render error: {error}");
        }
        for result in run.failing_results() {
            if result.message.is_empty() {
                let _ = writeln!(out, "      {} [{}]", result.taster_name, result.status);
            } else {
                let _ = writeln!(
                    out,
                    "      {} [{}]: {}",
                    result.taster_name, result.status, result.message
                );
            }
        }
    }

    let s = &report.summary;
    out.push('\n');
    let _ = writeln!(
        out,
        "Summary: {}/{} combinations passed ({} failed, {} render errors, {} incomplete)",
        s.passed, s.total, s.failed, s.render_errors, s.incomplete
    );
    let _ = writeln!(
        out,
        "Tasters: {} success, {} failure, {} skipped, {} error",
        s.statuses.success, s.statuses.failure, s.statuses.skipped, s.statuses.error
    );
    let _ = writeln!(out, "Duration: {}ms", report.duration_ms());
    out
}

fn marker(run: &CombinationRun) -> &'static str {
    if run.incomplete {
        "…"
    } else if run.passed() {
        "✓"
    } else {
        "✗"
    }
}

/// Write `report` as pretty JSON to `path`, creating parent directories.
pub fn write_json(report: &RunReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}
