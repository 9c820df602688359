//! Implementation of the `run` subcommand: render, then compare.

use log::info;
use std::time::Instant;

use rotobox_core::{CompressionComparison, FfprobeProbe, format_duration, write_comparison};

use crate::cli::RenderArgs;
use crate::commands::{compare, render};
use crate::error::CliResult;

/// Entry point for `rotobox run`.
pub fn run_all(args: &RenderArgs, show_progress: bool) -> CliResult<CompressionComparison> {
    let start = Instant::now();
    let job = render::prepare_job(args)?;
    let outcome = render::execute(&job, show_progress)?;

    let probe = FfprobeProbe::new(job.overlay.stage_timeout());
    let comparison = compare::compare_files(&probe, &job.input_path, &outcome.output_path)?;
    let record = write_comparison(&job.output_dir, &comparison)?;

    info!("========================================");
    info!("Compression Summary:");
    info!("========================================");
    for line in compare::summary_lines(&comparison) {
        info!("{line}");
    }
    info!("Comparison record: {}", record.display());
    info!("Total execution time: {}", format_duration(start.elapsed().as_secs_f64()));
    Ok(comparison)
}
