//! Implementation of the `render` subcommand.
//!
//! Validates the input and the ffmpeg installation, then hands the job to
//! `rotobox_core::render_overlay` with a progress bar attached.

use anyhow::Context;
use log::info;

use rotobox_core::{
    FfmpegBackend, JobConfig, RenderOutcome, format_duration, render_overlay, validate_environment,
    validate_input_video,
};

use crate::cli::RenderArgs;
use crate::config::job_from_args;
use crate::error::CliResult;
use crate::progress::RenderBar;

/// Checks the input file and resolves the job configuration.
///
/// Runs before anything touches ffmpeg, so bad arguments fail fast.
pub fn prepare_job(args: &RenderArgs) -> CliResult<JobConfig> {
    validate_input_video(&args.input_path)?;
    job_from_args(args)
}

/// Renders `job` with the ffmpeg backend.
pub fn execute(job: &JobConfig, show_progress: bool) -> CliResult<RenderOutcome> {
    validate_environment().context("ffmpeg environment check failed")?;
    info!("External dependency check passed.");

    info!("Input video: {}", job.input_path.display());
    info!("Output directory: {}", job.output_dir.display());
    info!(
        "Rectangle: {}x{} @ {:.2} opacity, color {:?}, turn every {}s",
        job.overlay.rect_width,
        job.overlay.rect_height,
        job.overlay.opacity,
        job.overlay.color,
        job.overlay.rotation_period_secs
    );

    let backend = FfmpegBackend::from_config(&job.overlay);
    let bar = RenderBar::new(show_progress);
    let result = render_overlay(&backend, job, |progress| bar.update(progress));
    bar.finish();
    let outcome =
        result.with_context(|| format!("Rendering failed for '{}'", job.input_path.display()))?;

    info!(
        "Rendered {} frames ({}x{} @ {:.3} fps) in {}",
        outcome.frames_rendered,
        outcome.geometry.width,
        outcome.geometry.height,
        outcome.geometry.fps,
        format_duration(outcome.elapsed.as_secs_f64())
    );
    if !outcome.audio_copied {
        info!("Source has no audio track; output is video only.");
    }
    info!("Overlay video: {}", outcome.output_path.display());
    info!("Telemetry log: {}", outcome.telemetry_path.display());
    Ok(outcome)
}

/// Entry point for `rotobox render`.
pub fn run_render(args: &RenderArgs, show_progress: bool) -> CliResult<RenderOutcome> {
    let job = prepare_job(args)?;
    execute(&job, show_progress)
}
