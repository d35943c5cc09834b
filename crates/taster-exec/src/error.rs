//! Error types for process-backed collaborators.

use std::path::PathBuf;

/// Errors produced while fetching, inspecting or executing against templates.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("{context} has an empty command")]
    EmptyCommand { context: String },

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' timed out after {timeout_secs} seconds")]
    Timeout { program: String, timeout_secs: u64 },

    #[error("template not found: {0}")]
    TemplateNotFound(PathBuf),

    #[error("cookiecutter.json not found in {0}")]
    MissingContext(PathBuf),

    #[error("invalid cookiecutter.json: {0}")]
    InvalidContext(String),

    #[error("git clone of '{url}' failed: {detail}")]
    Clone { url: String, detail: String },

    #[error("invalid taster config {path}: {detail}")]
    Config { path: String, detail: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for taster-exec operations.
pub type ExecResult<T> = std::result::Result<T, ExecError>;
