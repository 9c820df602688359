// ============================================================================
// rotobox-core/src/pipeline.rs
// ============================================================================
//
// RENDER PIPELINE: decode -> physics -> composite -> encode -> remux
//
// `render_overlay` runs one job end to end:
//
// 1. Probe the source and open a decoder.
// 2. Open a fast lossless intermediate encode in a scratch directory.
// 3. For every frame in order: advance the physics, draw the rectangle,
//    write the frame, record a telemetry row.
// 4. Finalize the intermediate, persist the telemetry CSV.
// 5. Re-encode at final quality with the original audio track.
//
// Any error aborts the job. The decoder and encoder are released on every
// exit path (their Drop impls kill and reap the processes) and the scratch
// directory is removed with them. A job returns a final output path only when
// the remux succeeded.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::compositor::{RectangleStyle, draw_rotated_rectangle};
use crate::config::JobConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::{EncodeTarget, FrameSink, FrameSource, MediaBackend};
use crate::physics::{FrameGeometry, PhysicsParams, RectanglePhysics};
use crate::remux::RemuxRequest;
use crate::telemetry::{RenderLogRow, TelemetryLog};
use crate::temp_files;
use crate::utils::get_filename_safe;

/// Frames between progress log lines.
pub const PROGRESS_LOG_INTERVAL: u64 = 200;

/// Upper bound on telemetry rows reserved up front.
const MAX_PREALLOCATED_ROWS: u64 = 1 << 16;

/// Progress notification sent after each rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderProgress {
    /// Frames rendered so far.
    pub frame: u64,
    /// Expected total, when the source knows it.
    pub total: Option<u64>,
}

/// Result of a completed render job.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    /// Final video (`overlay_video.mp4`).
    pub output_path: PathBuf,
    /// Telemetry log (`rectangle_log.csv`).
    pub telemetry_path: PathBuf,
    pub frames_rendered: u64,
    pub geometry: FrameGeometry,
    /// Whether an audio track was carried over from the source.
    pub audio_copied: bool,
    pub elapsed: Duration,
}

/// Renders the rotating rectangle overlay for `job`.
///
/// `on_progress` is called after every frame; pass `|_| {}` to ignore it.
pub fn render_overlay<B, F>(backend: &B, job: &JobConfig, mut on_progress: F) -> CoreResult<RenderOutcome>
where
    B: MediaBackend,
    F: FnMut(RenderProgress),
{
    let start = Instant::now();
    job.validate()?;
    info!("Rendering overlay: {}", get_filename_safe(&job.input_path)?);

    fs::create_dir_all(&job.output_dir)?;

    let metadata = backend.probe(&job.input_path).map_err(as_source_error)?;
    if !metadata.has_video() {
        return Err(CoreError::Source(format!(
            "no video stream found in {}",
            job.input_path.display()
        )));
    }

    let mut source = backend
        .open_source(&job.input_path, &metadata)
        .map_err(as_source_error)?;
    let geometry = source.geometry(job.overlay.default_fps);
    debug!(
        "Source geometry: {}x{} @ {:.3} fps, {} frames expected",
        geometry.width,
        geometry.height,
        geometry.fps,
        source
            .frame_count()
            .map_or_else(|| "unknown".to_string(), |n| n.to_string())
    );

    let scratch = temp_files::create_temp_dir(job, "rotobox_")?;
    let intermediate = temp_files::intermediate_path(scratch.path());
    let mut sink = backend.open_sink(&EncodeTarget {
        output_path: intermediate.clone(),
        width: geometry.width,
        height: geometry.height,
        fps: geometry.fps,
        rate: metadata
            .exact_frame_rate()
            .filter(|&(num, den)| f64::from(num) / f64::from(den) == geometry.fps),
        preset: job.overlay.intermediate_preset.clone(),
    })?;

    let telemetry = render_frames(&mut source, &mut sink, geometry, job, &mut on_progress)?;
    if telemetry.is_empty() {
        return Err(CoreError::Source(format!(
            "no frames could be decoded from {}",
            job.input_path.display()
        )));
    }
    sink.finish()?;
    drop(sink);
    drop(source);

    let telemetry_path = job.telemetry_path();
    telemetry.write_csv(&telemetry_path)?;

    let output_path = job.final_output_path();
    let request = RemuxRequest::new(
        intermediate,
        job.input_path.clone(),
        output_path.clone(),
        metadata.has_audio,
        &job.overlay,
    );
    if let Err(e) = backend.remux(&request) {
        discard_partial_output(&output_path);
        return Err(e);
    }

    if let Err(e) = scratch.close() {
        warn!("Failed to remove scratch directory: {e}");
    }

    let frames_rendered = telemetry.len() as u64;
    info!(
        "Created {} ({} frames)",
        output_path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
        frames_rendered
    );

    Ok(RenderOutcome {
        output_path,
        telemetry_path,
        frames_rendered,
        geometry,
        audio_copied: metadata.has_audio,
        elapsed: start.elapsed(),
    })
}

/// The per-frame loop. Stops at end of stream; any error aborts.
fn render_frames<S, K, F>(
    source: &mut S,
    sink: &mut K,
    geometry: FrameGeometry,
    job: &JobConfig,
    on_progress: &mut F,
) -> CoreResult<TelemetryLog>
where
    S: FrameSource,
    K: FrameSink,
    F: FnMut(RenderProgress),
{
    let total = source.frame_count();
    let total_label = total.map_or_else(|| "?".to_string(), |n| n.to_string());
    let mut physics = RectanglePhysics::new(geometry, PhysicsParams::from_config(&job.overlay));
    let style = RectangleStyle::from_config(&job.overlay);
    let mut telemetry =
        TelemetryLog::with_capacity(total.unwrap_or(0).min(MAX_PREALLOCATED_ROWS) as usize);

    let mut frame_index: u64 = 0;
    while let Some(mut frame) = source.next_frame()? {
        let state = physics.update(frame_index);
        draw_rotated_rectangle(
            &mut frame,
            state.center_x,
            state.center_y,
            state.angle_degrees,
            &style,
        );
        sink.write_frame(&frame)?;
        telemetry.push(RenderLogRow::record(frame_index, &geometry, &state));

        if frame_index % PROGRESS_LOG_INTERVAL == 0 {
            info!("Frame {frame_index} / {total_label}");
        }
        frame_index += 1;
        on_progress(RenderProgress {
            frame: frame_index,
            total,
        });
    }

    debug!("Decoded {frame_index} frames");
    Ok(telemetry)
}

/// Failures to read the input are reported as source errors.
fn as_source_error(err: CoreError) -> CoreError {
    match err {
        CoreError::Probe(msg) => CoreError::Source(msg),
        other => other,
    }
}

fn discard_partial_output(path: &std::path::Path) {
    if path.exists() {
        match fs::remove_file(path) {
            Ok(()) => debug!("Removed partial output {}", path.display()),
            Err(e) => warn!("Failed to remove partial output {}: {e}", path.display()),
        }
    }
}
