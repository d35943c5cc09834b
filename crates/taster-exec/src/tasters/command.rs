//! Tasters that run an external command inside the rendered project.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use taster_core::{ProjectInfo, Taster, TasterContext, TasterResult};

use crate::process::run_command;

fn default_timeout_secs() -> u64 {
    600
}

fn default_enabled() -> bool {
    true
}

/// Configuration for a command taster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTasterConfig {
    /// Taster name shown in results.
    pub name: String,

    /// Command to execute (first element is executable), run with the
    /// project directory as working directory.
    pub command: Vec<String>,

    /// Timeout in seconds; 0 disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Only handle combinations where every listed option takes one of
    /// the listed values.
    #[serde(default)]
    pub when: BTreeMap<String, Vec<String>>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl CommandTasterConfig {
    pub fn new(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
            timeout_secs: default_timeout_secs(),
            when: BTreeMap::new(),
            enabled: true,
        }
    }

    /// Restrict to combinations where `option` is one of `values`.
    pub fn when<I, S>(mut self, option: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.when
            .insert(option.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Runs a configured command; exit code 0 is success.
#[derive(Debug, Clone)]
pub struct CommandTaster {
    config: CommandTasterConfig,
}

impl CommandTaster {
    pub fn new(config: CommandTasterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CommandTasterConfig {
        &self.config
    }
}

#[async_trait]
impl Taster for CommandTaster {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn can_handle(&self, context: &TasterContext) -> anyhow::Result<bool> {
        Ok(self.config.when.iter().all(|(option, allowed)| {
            context
                .value(option)
                .is_some_and(|v| allowed.iter().any(|a| a == v))
        }))
    }

    async fn test_project(&self, project: &ProjectInfo) -> anyhow::Result<TasterResult> {
        let output =
            run_command(&self.config.command, Some(&project.path), self.config.timeout_secs).await?;

        let mut logs = vec![format!("$ {}", self.config.command.join(" "))];
        logs.extend(output.log_lines());

        let result = if output.passed() {
            TasterResult::success(&self.config.name, "command succeeded")
        } else {
            TasterResult::failure(
                &self.config.name,
                format!("command exited with code {}", output.exit_code),
            )
        };
        Ok(result.with_logs(logs).with_duration_ms(output.duration_ms))
    }
}
