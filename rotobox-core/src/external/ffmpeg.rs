//! FFmpeg-backed frame source, frame sink and remux.
//!
//! Decoding and the intermediate encode are streaming stages: the decoder
//! writes raw RGB24 frames to stdout, parsed by ffmpeg-sidecar's event
//! iterator, and the encoder reads raw RGB24 frames from stdin. Each stage is
//! guarded by a [`Watchdog`] that kills the process when a single frame read,
//! frame write or final wait exceeds the stage timeout. Time spent outside
//! those calls, such as compositing, does not count. The remux is a one-shot command run through
//! [`run_with_timeout`].

use std::io::Write;
use std::path::Path;
use std::process::{ChildStdin, Command, ExitStatus};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use ffmpeg_sidecar::iter::FfmpegIterator;
use image::RgbImage;
use log::{debug, error, warn};

use super::command::{Watchdog, lock, run_with_timeout, spawn_line_collector, wait_shared};
use super::{
    ContainerMetadata, EncodeTarget, FfprobeProbe, FrameSink, FrameSource, MediaBackend,
    MetadataProbe,
};
use crate::config::OverlayConfig;
use crate::error::{CoreError, CoreResult, Stage, command_start_error};
use crate::remux::{RemuxRequest, build_remux_args};

const FFMPEG_BIN: &str = "ffmpeg";

/// Number of stderr lines quoted in error messages.
const STDERR_TAIL_LINES: usize = 5;

// ============================================================================
// ARGUMENT BUILDERS
// ============================================================================

/// Decoder arguments: first video stream as raw RGB24 on stdout.
pub fn build_decode_args(input: &Path) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-map".into(),
        "0:v:0".into(),
        "-an".into(),
        "-sn".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-".into(),
    ]
}

/// Intermediate encoder arguments: raw RGB24 on stdin to lossless x264.
pub fn build_encode_args(target: &EncodeTarget) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-s".into(),
        format!("{}x{}", target.width, target.height),
        "-r".into(),
        frame_rate_arg(target),
        "-i".into(),
        "-".into(),
        "-an".into(),
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        target.preset.clone(),
        "-crf".into(),
        "0".into(),
        target.output_path.to_string_lossy().into_owned(),
    ]
}

/// Exact `num/den` rate when known, otherwise the decimal rate.
fn frame_rate_arg(target: &EncodeTarget) -> String {
    match target.rate {
        Some((num, den)) => format!("{num}/{den}"),
        None => target.fps.to_string(),
    }
}

/// Kills the shared child; used as a watchdog expiry action.
fn kill_on_expiry(child: Arc<Mutex<FfmpegChild>>, stage: Stage) -> impl FnOnce() + Send + 'static {
    move || {
        warn!("{stage} stage exceeded its time limit, killing ffmpeg");
        if let Err(e) = lock(&child).kill() {
            debug!("kill failed (process may have exited): {e}");
        }
    }
}

fn wait_child(child: &Mutex<FfmpegChild>) -> std::io::Result<ExitStatus> {
    wait_shared(child, |c| c.as_inner_mut().try_wait())
}

// ============================================================================
// DECODER
// ============================================================================

/// Decodes a video file into RGB frames through an ffmpeg child process.
pub struct FfmpegFrameSource {
    child: Arc<Mutex<FfmpegChild>>,
    events: FfmpegIterator,
    watchdog: Option<Watchdog>,
    width: u32,
    height: u32,
    frame_rate: f64,
    frame_count: Option<u64>,
    timeout: Duration,
    errors: Vec<String>,
    finished: bool,
}

impl FfmpegFrameSource {
    pub fn spawn(input: &Path, metadata: &ContainerMetadata, timeout: Duration) -> CoreResult<Self> {
        if !metadata.has_video() {
            return Err(CoreError::Source(format!(
                "no decodable video stream in {}",
                input.display()
            )));
        }

        let args = build_decode_args(input);
        debug!("Running decoder: {FFMPEG_BIN} {}", args.join(" "));

        let mut child = FfmpegCommand::new()
            .args(&args)
            .spawn()
            .map_err(|e| command_start_error("ffmpeg (decode)", e))?;
        let events = child
            .iter()
            .map_err(|e| CoreError::Source(format!("cannot read decoder output: {e}")))?;

        let child = Arc::new(Mutex::new(child));
        let watchdog = Watchdog::arm(timeout, kill_on_expiry(Arc::clone(&child), Stage::Decode));
        watchdog.pause();

        // A zero denominator is reported as an unknown rate.
        let frame_rate = if metadata.frame_rate_den == 0 {
            0.0
        } else {
            metadata.frame_rate()
        };
        let frame_count = metadata
            .nb_frames
            .or_else(|| (frame_rate > 0.0).then(|| metadata.estimated_frame_count()));

        Ok(Self {
            child,
            events,
            watchdog: Some(watchdog),
            width: metadata.width,
            height: metadata.height,
            frame_rate,
            frame_count,
            timeout,
            errors: Vec::new(),
            finished: false,
        })
    }

    /// Reaps the decoder once the event stream has ended.
    fn finish(&mut self) -> CoreResult<()> {
        self.finished = true;
        let status = wait_child(&self.child)?;
        let fired = self.watchdog.take().is_some_and(Watchdog::disarm);

        if fired {
            return Err(CoreError::StageTimeout {
                stage: Stage::Decode,
                seconds: self.timeout.as_secs(),
            });
        }
        if !status.success() {
            let start = self.errors.len().saturating_sub(STDERR_TAIL_LINES);
            error!("Decoder exited with {status}");
            return Err(CoreError::Source(format!(
                "decoder exited with {status}: {}",
                self.errors[start..].join("; ")
            )));
        }
        debug!("Decoder finished cleanly");
        Ok(())
    }
}

impl FrameSource for FfmpegFrameSource {
    fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn frame_count(&self) -> Option<u64> {
        self.frame_count
    }

    fn next_frame(&mut self) -> CoreResult<Option<RgbImage>> {
        if self.finished {
            return Ok(None);
        }

        if let Some(watchdog) = &self.watchdog {
            watchdog.resume();
        }
        for event in self.events.by_ref() {
            match event {
                FfmpegEvent::OutputFrame(frame) => {
                    if frame.width != self.width || frame.height != self.height {
                        return Err(CoreError::Source(format!(
                            "decoder produced a {}x{} frame, expected {}x{}",
                            frame.width, frame.height, self.width, self.height
                        )));
                    }
                    if let Some(watchdog) = &self.watchdog {
                        watchdog.pause();
                    }
                    let (width, height) = (frame.width, frame.height);
                    return RgbImage::from_raw(width, height, frame.data)
                        .map(Some)
                        .ok_or_else(|| {
                            CoreError::Source(format!("short frame buffer for {width}x{height}"))
                        });
                }
                FfmpegEvent::Error(message)
                | FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, message) => {
                    debug!("decoder: {message}");
                    self.errors.push(message);
                }
                FfmpegEvent::Done => break,
                _ => {}
            }
        }

        self.finish()?;
        Ok(None)
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut child = lock(&self.child);
        let _ = child.kill();
        let _ = child.wait();
    }
}

// ============================================================================
// INTERMEDIATE ENCODER
// ============================================================================

/// Encodes RGB frames into the intermediate file through an ffmpeg child process.
pub struct FfmpegFrameSink {
    child: Arc<Mutex<FfmpegChild>>,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<Vec<String>>>,
    watchdog: Option<Watchdog>,
    width: u32,
    height: u32,
    timeout: Duration,
    frames_written: u64,
    finished: bool,
}

impl FfmpegFrameSink {
    pub fn spawn(target: &EncodeTarget, timeout: Duration) -> CoreResult<Self> {
        Self::spawn_with(FfmpegCommand::new(), target, timeout)
    }

    /// Spawns the encoder from a prepared command, such as one naming a
    /// specific binary.
    fn spawn_with(mut command: FfmpegCommand, target: &EncodeTarget, timeout: Duration) -> CoreResult<Self> {
        let args = build_encode_args(target);
        debug!("Running intermediate encoder: {FFMPEG_BIN} {}", args.join(" "));

        let mut child = command
            .args(&args)
            .spawn()
            .map_err(|e| command_start_error("ffmpeg (intermediate encode)", e))?;

        let stdin = child
            .take_stdin()
            .ok_or_else(|| CoreError::Encode("encoder stdin unavailable".to_string()))?;
        let stderr = child
            .take_stderr()
            .map(|pipe| spawn_line_collector(pipe, "encoder"));

        let child = Arc::new(Mutex::new(child));
        let watchdog = Watchdog::arm(timeout, kill_on_expiry(Arc::clone(&child), Stage::Encode));
        watchdog.pause();

        Ok(Self {
            child,
            stdin: Some(stdin),
            stderr,
            watchdog: Some(watchdog),
            width: target.width,
            height: target.height,
            timeout,
            frames_written: 0,
            finished: false,
        })
    }

    fn timed_out(&self) -> bool {
        self.watchdog.as_ref().is_some_and(Watchdog::fired)
    }

    fn resume_watchdog(&self) {
        if let Some(watchdog) = &self.watchdog {
            watchdog.resume();
        }
    }

    fn pause_watchdog(&self) {
        if let Some(watchdog) = &self.watchdog {
            watchdog.pause();
        }
    }

    fn timeout_error(&self) -> CoreError {
        CoreError::StageTimeout {
            stage: Stage::Encode,
            seconds: self.timeout.as_secs(),
        }
    }
}

impl FrameSink for FfmpegFrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> CoreResult<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(CoreError::Encode(format!(
                "frame size {}x{} does not match encoder size {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        self.resume_watchdog();
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(CoreError::Encode("encoder is already finalized".to_string()));
        };

        if let Err(e) = stdin.write_all(frame.as_raw()) {
            if self.timed_out() {
                return Err(self.timeout_error());
            }
            return Err(CoreError::Encode(format!(
                "failed to write frame {} to encoder: {e}",
                self.frames_written
            )));
        }
        self.pause_watchdog();
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> CoreResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        // Closing stdin signals end of input.
        self.resume_watchdog();
        drop(self.stdin.take());
        let status = wait_child(&self.child)?;
        let fired = self.watchdog.take().is_some_and(Watchdog::disarm);
        let stderr = self
            .stderr
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if fired {
            return Err(self.timeout_error());
        }
        if !status.success() {
            let start = stderr.len().saturating_sub(STDERR_TAIL_LINES);
            error!("Intermediate encoder exited with {status}");
            return Err(CoreError::Encode(format!(
                "intermediate encoder exited with {status}: {}",
                stderr[start..].join("; ")
            )));
        }

        debug!("Intermediate encode finished ({} frames)", self.frames_written);
        Ok(())
    }
}

impl Drop for FfmpegFrameSink {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        drop(self.stdin.take());
        let mut child = lock(&self.child);
        let _ = child.kill();
        let _ = child.wait();
    }
}

// ============================================================================
// BACKEND
// ============================================================================

/// [`MediaBackend`] running the ffmpeg and ffprobe binaries.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    timeout: Duration,
    probe: FfprobeProbe,
}

impl FfmpegBackend {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            probe: FfprobeProbe::new(timeout),
        }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(config.stage_timeout())
    }
}

impl MetadataProbe for FfmpegBackend {
    fn probe(&self, path: &Path) -> CoreResult<ContainerMetadata> {
        self.probe.probe(path)
    }
}

impl MediaBackend for FfmpegBackend {
    type Source = FfmpegFrameSource;
    type Sink = FfmpegFrameSink;

    fn open_source(&self, input: &Path, metadata: &ContainerMetadata) -> CoreResult<Self::Source> {
        FfmpegFrameSource::spawn(input, metadata, self.timeout)
    }

    fn open_sink(&self, target: &EncodeTarget) -> CoreResult<Self::Sink> {
        FfmpegFrameSink::spawn(target, self.timeout)
    }

    fn remux(&self, request: &RemuxRequest) -> CoreResult<()> {
        let mut cmd = Command::new(FFMPEG_BIN);
        cmd.args(build_remux_args(request));

        let output = run_with_timeout(&mut cmd, self.timeout, Stage::Remux)?;
        if !output.status.success() {
            error!("Remux exited with {}", output.status);
            return Err(CoreError::Remux(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                output.stderr_tail(STDERR_TAIL_LINES)
            )));
        }
        if !request.output.is_file() {
            return Err(CoreError::Remux(format!(
                "ffmpeg reported success but {} was not created",
                request.output.display()
            )));
        }
        Ok(())
    }
}
