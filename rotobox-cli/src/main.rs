// ============================================================================
// rotobox-cli/src/main.rs
// ============================================================================
//
// ROTOBOX CLI: entry point
//
// Parses arguments, sets up logging, dispatches to the subcommand, and turns
// the result into a process exit code.

use clap::Parser;
use log::{debug, info};
use std::process::ExitCode;

use rotobox_cli::logging::{LogOptions, init_logging};
use rotobox_cli::{Cli, Commands, error_hint, exit_code, run_all, run_compare, run_render};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match init_logging(&LogOptions {
        level: cli.level_filter(),
        log_dir: cli.effective_log_dir(),
        progress_bar: cli.show_progress(),
    }) {
        Ok(Some(path)) => debug!("Log file: {}", path.display()),
        Ok(None) => {}
        Err(e) => eprintln!("Warning: logging disabled: {e:#}"),
    }
    info!("Rotobox {} started", env!("CARGO_PKG_VERSION"));

    let show_progress = cli.show_progress();
    let result = match &cli.command {
        Commands::Render(args) => run_render(args, show_progress).map(drop),
        Commands::Compare(args) => run_compare(args).map(drop),
        Commands::Run(args) => run_all(args, show_progress).map(drop),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(hint) = error_hint(&e) {
                eprintln!("Hint: {hint}");
            }
            ExitCode::from(exit_code(&e))
        }
    }
}
