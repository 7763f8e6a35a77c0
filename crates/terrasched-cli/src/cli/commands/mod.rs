//! CLI command handlers. Each command is in its own file.

mod config;
mod memory_terrain;
mod simulate;

pub use config::run_config;
pub use simulate::{run_simulate, SimulateArgs};
