//! Template resolution and inspection.
//!
//! A template source is either a local directory or a git URL. Remote
//! sources are shallow-cloned into a temporary checkout that lives as long
//! as the returned [`ResolvedTemplate`].

use std::path::{Path, PathBuf};

use serde_json::Value;
use taster_core::{OptionSchema, TemplateMetadata};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::{ExecError, ExecResult};
use crate::process::run_command;

/// File holding a template's variables.
pub const CONTEXT_FILE: &str = "cookiecutter.json";

const CLONE_TIMEOUT_SECS: u64 = 300;

/// Whether `source` names a remote git repository rather than a local path.
pub fn is_remote(source: &str) -> bool {
    const PREFIXES: [&str; 5] = ["https://", "http://", "git@", "ssh://", "file://"];
    PREFIXES.iter().any(|p| source.starts_with(p)) || source.ends_with(".git")
}

/// A template available on the local filesystem.
#[derive(Debug)]
pub struct ResolvedTemplate {
    dir: PathBuf,
    metadata: TemplateMetadata,
    _checkout: Option<TempDir>,
}

impl ResolvedTemplate {
    /// Wrap an existing local template directory.
    pub fn local(dir: impl Into<PathBuf>) -> ExecResult<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(ExecError::TemplateNotFound(dir));
        }
        let mut metadata = TemplateMetadata::new(dir.display().to_string());
        metadata.name = dir_name(&dir);
        metadata.version = head_sha(&dir);
        Ok(Self {
            dir,
            metadata,
            _checkout: None,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn metadata(&self) -> &TemplateMetadata {
        &self.metadata
    }

    /// Read the template's option schema.
    pub fn schema(&self) -> ExecResult<OptionSchema> {
        inspect_template(&self.dir)
    }
}

/// Make `source` available locally, cloning it when remote.
pub async fn resolve_template(source: &str) -> ExecResult<ResolvedTemplate> {
    if !is_remote(source) {
        return ResolvedTemplate::local(source);
    }

    let checkout = tempfile::Builder::new().prefix("cookie-taster-").tempdir()?;
    let dir = checkout.path().join("template");
    info!(source, dest = %dir.display(), "cloning template");

    let argv = vec![
        "git".to_string(),
        "clone".to_string(),
        "--depth".to_string(),
        "1".to_string(),
        source.to_string(),
        dir.display().to_string(),
    ];
    let output = run_command(&argv, None, CLONE_TIMEOUT_SECS)
        .await
        .map_err(|e| ExecError::Clone {
            url: source.to_string(),
            detail: e.to_string(),
        })?;
    if !output.passed() {
        return Err(ExecError::Clone {
            url: source.to_string(),
            detail: output.stderr.trim().to_string(),
        });
    }

    let mut metadata = TemplateMetadata::new(source);
    metadata.name = repo_name(source);
    metadata.version = head_sha(&dir);
    Ok(ResolvedTemplate {
        dir,
        metadata,
        _checkout: Some(checkout),
    })
}

/// Parse the contents of a `cookiecutter.json` into an option schema.
///
/// Only non-empty list values become options; scalars are plain defaults
/// and `_`-prefixed keys are cookiecutter internals. Choices are
/// stringified, and key order is preserved.
pub fn parse_context(json: &str) -> ExecResult<OptionSchema> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| ExecError::InvalidContext(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(ExecError::InvalidContext(
            "top-level value must be an object".to_string(),
        ));
    };

    let mut schema = OptionSchema::new();
    for (name, value) in map {
        if name.starts_with('_') {
            continue;
        }
        match value {
            Value::Array(items) if !items.is_empty() => {
                schema.push(name, items.iter().map(choice_text));
            }
            _ => debug!(option = %name, "not a choice variable; skipping"),
        }
    }
    Ok(schema)
}

/// Read and parse `<dir>/cookiecutter.json`.
pub fn inspect_template(dir: &Path) -> ExecResult<OptionSchema> {
    if !dir.is_dir() {
        return Err(ExecError::TemplateNotFound(dir.to_path_buf()));
    }
    let path = dir.join(CONTEXT_FILE);
    if !path.is_file() {
        return Err(ExecError::MissingContext(dir.to_path_buf()));
    }
    let json = std::fs::read_to_string(&path)?;
    parse_context(&json)
}

fn choice_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn dir_name(dir: &Path) -> Option<String> {
    dir.file_name().map(|n| n.to_string_lossy().to_string())
}

fn repo_name(source: &str) -> Option<String> {
    let tail = source
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()?
        .trim_end_matches(".git");
    (!tail.is_empty()).then(|| tail.to_string())
}

/// HEAD commit of `dir`, if `dir` is itself the root of a git checkout.
///
/// A template nested inside some other repository has no version of its own.
fn head_sha(dir: &Path) -> Option<String> {
    let toplevel = git_output(dir, &["rev-parse", "--show-toplevel"])?;
    let same_root = match (std::fs::canonicalize(&toplevel), std::fs::canonicalize(dir)) {
        (Ok(root), Ok(dir)) => root == dir,
        _ => false,
    };
    if !same_root {
        debug!(dir = %dir.display(), toplevel = %toplevel, "template is not a repository root; no version");
        return None;
    }
    git_output(dir, &["rev-parse", "HEAD"])
}

fn git_output(dir: &Path, args: &[&str]) -> Option<String> {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}
