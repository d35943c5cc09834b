//! Built-in taster checking that a rendered project has content.

use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context};
use async_trait::async_trait;
use taster_core::{ProjectInfo, Taster, TasterContext, TasterResult};
use walkdir::WalkDir;

const README_NAMES: [&str; 4] = ["README.md", "README.rst", "README.txt", "README"];

/// Checks that the project directory exists and contains files.
///
/// A missing README is logged but does not fail the project.
#[derive(Debug, Default, Clone)]
pub struct StructureTaster;

impl StructureTaster {
    pub const NAME: &'static str = "structure";

    pub fn new() -> Self {
        Self
    }
}

struct Survey {
    file_count: usize,
    has_readme: bool,
}

fn survey_dir(root: &Path) -> anyhow::Result<Survey> {
    if !root.is_dir() {
        bail!("project directory does not exist: {}", root.display());
    }
    let has_readme = README_NAMES.iter().any(|name| root.join(name).is_file());
    let mut file_count = 0;
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        if entry.file_type().is_file() {
            file_count += 1;
        }
    }
    Ok(Survey {
        file_count,
        has_readme,
    })
}

#[async_trait]
impl Taster for StructureTaster {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn can_handle(&self, _context: &TasterContext) -> anyhow::Result<bool> {
        Ok(true)
    }

    async fn test_project(&self, project: &ProjectInfo) -> anyhow::Result<TasterResult> {
        let start = Instant::now();
        let root = project.path.clone();
        let survey = tokio::task::spawn_blocking(move || survey_dir(&root))
            .await
            .context("structure survey task failed")??;

        let mut logs = vec![
            format!("Testing project at: {}", project.path.display()),
            format!("Context: {}", project.combination),
        ];
        logs.push(if survey.has_readme {
            "Found README file".to_string()
        } else {
            "No README file found".to_string()
        });
        logs.push(format!("Total files in project: {}", survey.file_count));

        let result = match (survey.file_count, survey.has_readme) {
            (0, _) => TasterResult::failure(Self::NAME, "Project has no files"),
            (n, true) => {
                TasterResult::success(Self::NAME, format!("Project structure looks good ({n} files)"))
            }
            (n, false) => TasterResult::success(
                Self::NAME,
                format!("Project generated successfully ({n} files, but no README)"),
            ),
        };
        Ok(result
            .with_logs(logs)
            .with_duration_ms(start.elapsed().as_millis() as u64))
    }
}
