// rotobox-cli/src/lib.rs
//
// Library portion of the Rotobox CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod progress;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, CompareArgs, OverlayArgs, RenderArgs};
pub use commands::compare::run_compare;
pub use commands::render::run_render;
pub use commands::run::run_all;
pub use error::{CliResult, error_hint, exit_code};
