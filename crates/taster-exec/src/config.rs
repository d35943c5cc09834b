//! Taster configuration file.
//!
//! ```json
//! {
//!   "structure": true,
//!   "commands": [
//!     { "name": "pytest", "command": ["pytest", "-q"], "timeout_secs": 900 },
//!     { "name": "docker-build", "command": ["docker", "build", "."],
//!       "when": { "use_docker": ["y"] } }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use taster_core::TasterRegistry;
use tracing::debug;

use crate::error::{ExecError, ExecResult};
use crate::tasters::{CommandTaster, CommandTasterConfig, StructureTaster};

fn default_structure() -> bool {
    true
}

/// Which tasters to run, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasterConfig {
    /// Run the built-in structure taster first.
    #[serde(default = "default_structure")]
    pub structure: bool,

    #[serde(default)]
    pub commands: Vec<CommandTasterConfig>,
}

impl Default for TasterConfig {
    fn default() -> Self {
        Self {
            structure: true,
            commands: Vec::new(),
        }
    }
}

impl TasterConfig {
    /// Load and validate a JSON taster config.
    pub fn load(path: &Path) -> ExecResult<Self> {
        let invalid = |detail: String| ExecError::Config {
            path: path.display().to_string(),
            detail,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?;
        config.validate().map_err(invalid)?;
        debug!(path = %path.display(), commands = config.commands.len(), "loaded taster config");
        Ok(config)
    }

    /// Taster names must be unique and commands non-empty.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        if self.structure {
            seen.insert(StructureTaster::NAME);
        }
        for command in &self.commands {
            if command.command.is_empty() {
                return Err(format!("taster '{}' has an empty command", command.name));
            }
            if !seen.insert(command.name.as_str()) {
                return Err(format!("duplicate taster name '{}'", command.name));
            }
        }
        Ok(())
    }

    /// Build the registry: structure first, then enabled commands in file order.
    pub fn build_registry(&self) -> TasterRegistry {
        let mut registry = TasterRegistry::new();
        if self.structure {
            registry.register(Arc::new(StructureTaster::new()));
        }
        for command in self.commands.iter().filter(|c| c.enabled) {
            registry.register(Arc::new(CommandTaster::new(command.clone())));
        }
        registry
    }
}
