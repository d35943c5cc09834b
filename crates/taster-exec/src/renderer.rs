//! Rendering combinations with the `cookiecutter` executable.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use taster_core::{Combination, ProjectInfo, ProjectRenderer, RenderError, TemplateMetadata};
use tracing::{debug, info};

use crate::error::ExecResult;
use crate::process::run_command;
use crate::template::ResolvedTemplate;

/// Default program used to render templates.
pub const DEFAULT_PROGRAM: &str = "cookiecutter";

/// Default per-render timeout.
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 300;

/// Renders each combination into `<output_root>/combo-NNNN/<project>`.
#[derive(Debug, Clone)]
pub struct CookiecutterRenderer {
    program: String,
    template_dir: PathBuf,
    metadata: TemplateMetadata,
    output_root: PathBuf,
    timeout_secs: u64,
}

impl CookiecutterRenderer {
    pub fn new(template: &ResolvedTemplate, output_root: impl Into<PathBuf>) -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            template_dir: template.dir().to_path_buf(),
            metadata: template.metadata().clone(),
            output_root: output_root.into(),
            timeout_secs: DEFAULT_RENDER_TIMEOUT_SECS,
        }
    }

    /// Use a different cookiecutter-compatible executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Directory that receives combination `index`.
    pub fn combination_dir(&self, index: usize) -> PathBuf {
        self.output_root.join(format!("combo-{index:04}"))
    }

    fn command_for(&self, output_dir: &Path, combination: &Combination) -> Vec<String> {
        let mut argv = vec![
            self.program.clone(),
            "--no-input".to_string(),
            "--output-dir".to_string(),
            output_dir.display().to_string(),
            self.template_dir.display().to_string(),
        ];
        argv.extend(combination.iter().map(|(k, v)| format!("{k}={v}")));
        argv
    }
}

#[async_trait]
impl ProjectRenderer for CookiecutterRenderer {
    async fn render(&self, index: usize, combination: &Combination) -> Result<ProjectInfo, RenderError> {
        let output_dir = self.combination_dir(index);
        reset_dir(&output_dir)
            .await
            .map_err(|e| RenderError::new(format!("cannot prepare {}: {e}", output_dir.display())))?;

        let argv = self.command_for(&output_dir, combination);
        let output = run_command(&argv, None, self.timeout_secs)
            .await
            .map_err(|e| RenderError::new(e.to_string()))?;
        if !output.passed() {
            let detail = output.stderr.trim();
            return Err(RenderError::new(format!(
                "{} exited with code {}: {}",
                self.program, output.exit_code, detail
            )));
        }

        let project_dir = generated_project(&output_dir).await.map_err(|e| {
            RenderError::new(format!("cannot read {}: {e}", output_dir.display()))
        })?;
        let Some(project_dir) = project_dir else {
            return Err(RenderError::new(format!(
                "{} produced no project directory in {}",
                self.program,
                output_dir.display()
            )));
        };

        debug!(index, path = %project_dir.display(), duration_ms = output.duration_ms, "rendered");
        Ok(ProjectInfo::new(project_dir, combination.clone(), self.metadata.clone()))
    }
}

/// Create `root`, removing its previous contents when `clean` is set.
pub async fn prepare_output_root(root: &Path, clean: bool) -> ExecResult<()> {
    if clean && root.exists() {
        info!(root = %root.display(), "cleaning output directory");
        tokio::fs::remove_dir_all(root).await?;
    }
    tokio::fs::create_dir_all(root).await?;
    Ok(())
}

async fn reset_dir(dir: &Path) -> std::io::Result<()> {
    if dir.exists() {
        tokio::fs::remove_dir_all(dir).await?;
    }
    tokio::fs::create_dir_all(dir).await
}

/// First subdirectory of `dir` in name order.
async fn generated_project(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs.into_iter().next())
}
