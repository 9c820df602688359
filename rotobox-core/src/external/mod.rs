// ============================================================================
// rotobox-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Collaborator interfaces and their ffmpeg implementations
//
// The render pipeline and the comparator never spawn processes themselves.
// They talk to a narrow set of traits:
//
// - MetadataProbe: container size, duration, bitrate and frame rate of a file
// - FrameSource:   sequential decoded RGB frames
// - FrameSink:     sequential RGB frames into an intermediate encode
// - MediaBackend:  opens sources and sinks and performs the quality remux
//
// `FfmpegBackend` and `FfprobeProbe` implement them on top of the ffmpeg and
// ffprobe binaries; tests substitute fabricated implementations.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use image::RgbImage;

use crate::config::DEFAULT_FPS;
use crate::error::{CoreError, CoreResult, Stage};
use crate::physics::FrameGeometry;
use crate::remux::RemuxRequest;

pub mod command;
pub mod ffmpeg;
pub mod ffprobe;

pub use ffmpeg::{FfmpegBackend, FfmpegFrameSink, FfmpegFrameSource};
pub use ffprobe::FfprobeProbe;

// ============================================================================
// COLLABORATOR INTERFACES
// ============================================================================

/// Container-level facts about a finished media file.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerMetadata {
    /// Container size in bytes.
    pub size_bytes: u64,
    pub duration_secs: f64,
    /// Overall bitrate in bits per second.
    pub bit_rate: u64,
    pub frame_rate_num: u32,
    pub frame_rate_den: u32,
    pub width: u32,
    pub height: u32,
    /// Frame count declared by the container, if any.
    pub nb_frames: Option<u64>,
    pub has_audio: bool,
}

impl ContainerMetadata {
    /// Declared frame rate; a zero denominator means [`DEFAULT_FPS`].
    pub fn frame_rate(&self) -> f64 {
        if self.frame_rate_den == 0 {
            DEFAULT_FPS
        } else {
            f64::from(self.frame_rate_num) / f64::from(self.frame_rate_den)
        }
    }

    /// Frame count from `duration * frame_rate`, never below 1.
    pub fn estimated_frame_count(&self) -> u64 {
        let estimate = (self.duration_secs * self.frame_rate()).round();
        if estimate.is_finite() && estimate >= 1.0 {
            estimate as u64
        } else {
            1
        }
    }

    /// Declared rate as an exact `(num, den)` pair, if both parts are known.
    pub fn exact_frame_rate(&self) -> Option<(u32, u32)> {
        (self.frame_rate_num > 0 && self.frame_rate_den > 0).then_some((self.frame_rate_num, self.frame_rate_den))
    }

    /// Whether a video stream with usable dimensions was found.
    pub fn has_video(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Reads container metadata from a file.
pub trait MetadataProbe {
    fn probe(&self, path: &Path) -> CoreResult<ContainerMetadata>;
}

/// Sequential decoded frames of a fixed size.
///
/// Dropping a source releases the underlying decoder.
pub trait FrameSource {
    /// Width and height of every frame.
    fn frame_size(&self) -> (u32, u32);

    /// Declared frames per second; zero or negative when unknown.
    fn frame_rate(&self) -> f64;

    /// Geometry with `fallback_fps` substituted for an unknown rate.
    fn geometry(&self, fallback_fps: f64) -> FrameGeometry {
        let (width, height) = self.frame_size();
        FrameGeometry::with_fallback_fps(width, height, self.frame_rate(), fallback_fps)
    }

    /// Total frames the source expects to deliver, when known.
    fn frame_count(&self) -> Option<u64>;

    /// Next frame in presentation order, or `None` at end of stream.
    fn next_frame(&mut self) -> CoreResult<Option<RgbImage>>;
}

/// Where the intermediate encode is written and how.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeTarget {
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Exact source rate as `(num, den)`, when it matches `fps`.
    pub rate: Option<(u32, u32)>,
    pub preset: String,
}

/// Accepts sequential frames for one encode job.
///
/// Dropping a sink without `finish` abandons the encode.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> CoreResult<()>;

    /// Flushes and finalizes the encode. Further writes are errors.
    fn finish(&mut self) -> CoreResult<()>;
}

/// Everything the render pipeline needs from the outside world.
pub trait MediaBackend: MetadataProbe {
    type Source: FrameSource;
    type Sink: FrameSink;

    /// Opens a decoder for `input`, whose metadata was probed beforehand.
    fn open_source(&self, input: &Path, metadata: &ContainerMetadata) -> CoreResult<Self::Source>;

    fn open_sink(&self, target: &EncodeTarget) -> CoreResult<Self::Sink>;

    /// Runs the quality-pass re-encode with audio remux.
    fn remux(&self, request: &RemuxRequest) -> CoreResult<()>;
}

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// Upper bound for a `-version` call.
const DEPENDENCY_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Checks that `cmd_name` can be executed (runs `<cmd> -version`).
pub fn check_dependency(cmd_name: &str) -> CoreResult<()> {
    check_dependency_within(cmd_name, DEPENDENCY_CHECK_TIMEOUT)
}

fn check_dependency_within(cmd_name: &str, timeout: Duration) -> CoreResult<()> {
    let mut cmd = Command::new(cmd_name);
    cmd.arg("-version");

    match command::run_with_timeout(&mut cmd, timeout, Stage::Probe) {
        Ok(_) => {
            log::debug!("Found dependency: {cmd_name}");
            Ok(())
        }
        Err(CoreError::CommandStart(_, e)) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{cmd_name}' not found.");
            Err(CoreError::DependencyNotFound(cmd_name.to_string()))
        }
        Err(e) => {
            log::error!("Dependency check for '{cmd_name}' failed: {e}");
            Err(e)
        }
    }
}
