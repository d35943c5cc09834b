//! Child process execution with timeouts and captured output.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::debug;

use crate::error::{ExecError, ExecResult};

/// Captured result of a finished child process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code (-1 when killed by a signal).
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub success: bool,
}

impl CommandOutput {
    /// Whether the process exited with code 0.
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }

    /// Stdout then stderr, one entry per non-empty line.
    pub fn log_lines(&self) -> Vec<String> {
        self.stdout
            .lines()
            .chain(self.stderr.lines())
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Run `command` (first element is the executable) to completion.
///
/// A `timeout_secs` of 0 waits indefinitely. The child is killed if the
/// timeout elapses.
pub async fn run_command(
    command: &[String],
    cwd: Option<&Path>,
    timeout_secs: u64,
) -> ExecResult<CommandOutput> {
    let (exe, args) = command.split_first().ok_or_else(|| ExecError::EmptyCommand {
        context: "process".to_string(),
    })?;

    let start = Instant::now();
    let mut cmd = Command::new(exe);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    debug!(program = %exe, args = ?args, "spawning process");
    let child = cmd.spawn().map_err(|source| ExecError::Spawn {
        program: exe.clone(),
        source,
    })?;

    let output = if timeout_secs > 0 {
        tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
            .await
            .map_err(|_| ExecError::Timeout {
                program: exe.clone(),
                timeout_secs,
            })??
    } else {
        child.wait_with_output().await?
    };

    Ok(CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
        success: output.status.success(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_command_output_passed() {
        let output = CommandOutput {
            exit_code: 0,
            stdout: "ok\n\n".to_string(),
            stderr: "warn\n".to_string(),
            duration_ms: 1,
            success: true,
        };
        assert!(output.passed());
        assert_eq!(output.log_lines(), vec!["ok", "warn"]);
    }

    #[tokio::test]
    async fn test_execute_simple_command() {
        let output = run_command(&argv(&["echo", "hello"]), None, 60)
            .await
            .expect("execute failed");
        assert!(output.passed());
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_execute_failing_command() {
        let output = run_command(&argv(&["false"]), None, 60)
            .await
            .expect("execute failed");
        assert!(!output.passed());
        assert_ne!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let err = run_command(&[], None, 60).await.unwrap_err();
        assert!(matches!(err, ExecError::EmptyCommand { .. }));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = run_command(&argv(&["definitely-not-a-real-program-xyz"]), None, 60)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_timeout_kills_command() {
        let err = run_command(&argv(&["sleep", "5"]), None, 1).await.unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let output = run_command(&argv(&["ls"]), Some(dir.path()), 60)
            .await
            .expect("execute failed");
        assert!(output.stdout.contains("marker.txt"));
    }
}
