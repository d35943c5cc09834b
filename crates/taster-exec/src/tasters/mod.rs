//! Built-in tasters.

pub mod command;
pub mod structure;

pub use command::{CommandTaster, CommandTasterConfig};
pub use structure::StructureTaster;
