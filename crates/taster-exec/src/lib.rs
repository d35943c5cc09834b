//! Cookie Taster process backends
//!
//! Everything that touches the outside world: resolving and inspecting
//! templates, rendering combinations with `cookiecutter`, and the built-in
//! structure and command tasters.

pub mod config;
pub mod error;
pub mod process;
pub mod renderer;
pub mod tasters;
pub mod template;

pub use config::TasterConfig;
pub use error::{ExecError, ExecResult};
pub use process::{run_command, CommandOutput};
pub use renderer::{prepare_output_root, CookiecutterRenderer};
pub use tasters::{CommandTaster, CommandTasterConfig, StructureTaster};
pub use template::{inspect_template, is_remote, parse_context, resolve_template, ResolvedTemplate};
