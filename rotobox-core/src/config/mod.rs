//! Configuration structures and constants for the rotobox-core library.
//!
//! `OverlayConfig` carries everything the render job needs to know about the
//! rectangle and the encoders; `JobConfig` adds the paths of one job. Both are
//! immutable once built and are passed explicitly to every component.

mod builder;

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use builder::JobConfigBuilder;

// Default constants

/// Rectangle width in pixels.
pub const DEFAULT_RECT_WIDTH: u32 = 200;

/// Rectangle height in pixels.
pub const DEFAULT_RECT_HEIGHT: u32 = 100;

/// 70% opaque, the background stays visible through the rectangle.
pub const DEFAULT_OPACITY: f64 = 0.7;

/// Seconds for one full 360 degree rotation.
pub const DEFAULT_ROTATION_PERIOD_SECS: f64 = 5.0;

/// Horizontal speed in pixels per frame.
pub const DEFAULT_VELOCITY_X: f64 = 5.0;

/// Vertical speed in pixels per frame.
pub const DEFAULT_VELOCITY_Y: f64 = 3.0;

/// Fill color (RGB). Pure red is high contrast on most footage.
pub const DEFAULT_COLOR: [u8; 3] = [255, 0, 0];

/// Final-pass libx264 CRF. 18 is visually lossless.
/// Range: 0-51, lower values produce higher quality but larger files.
pub const DEFAULT_FINAL_CRF: u8 = 18;

/// Final-pass libx264 preset.
pub const DEFAULT_FINAL_PRESET: &str = "medium";

/// Preset for the silent intermediate encode written during the render loop.
pub const DEFAULT_INTERMEDIATE_PRESET: &str = "ultrafast";

/// Wall-clock limit for any single external stage.
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 600;

/// Frame rate assumed when the source cannot report one.
pub const DEFAULT_FPS: f64 = 30.0;

/// File name of the final rendered video inside the output directory.
pub const OVERLAY_VIDEO_FILENAME: &str = "overlay_video.mp4";

/// File name of the per-frame telemetry log.
pub const TELEMETRY_FILENAME: &str = "rectangle_log.csv";

/// File name of the before/after comparison record.
pub const COMPARISON_FILENAME: &str = "compression_comparison.json";

/// Largest CRF libx264 accepts for 8-bit output.
const MAX_CRF: u8 = 51;

/// Rectangle, compositing and encoder settings for one render job.
///
/// Loaded from JSON with every field optional; missing fields take the
/// defaults above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Rectangle width in pixels.
    pub rect_width: u32,

    /// Rectangle height in pixels.
    pub rect_height: u32,

    /// Blend weight of the filled rectangle, 0.0 (invisible) to 1.0 (solid).
    pub opacity: f64,

    /// Seconds per full rotation.
    pub rotation_period_secs: f64,

    /// Initial horizontal velocity in pixels per frame.
    pub velocity_x: f64,

    /// Initial vertical velocity in pixels per frame.
    pub velocity_y: f64,

    /// Fill color as RGB.
    pub color: [u8; 3],

    /// CRF of the quality pass.
    pub final_crf: u8,

    /// libx264 preset of the quality pass.
    pub final_preset: String,

    /// libx264 preset of the intermediate pass.
    pub intermediate_preset: String,

    /// Per-stage timeout for probe, decode, encode and remux.
    pub stage_timeout_secs: u64,

    /// Frame rate used when the source reports none.
    pub default_fps: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            rect_width: DEFAULT_RECT_WIDTH,
            rect_height: DEFAULT_RECT_HEIGHT,
            opacity: DEFAULT_OPACITY,
            rotation_period_secs: DEFAULT_ROTATION_PERIOD_SECS,
            velocity_x: DEFAULT_VELOCITY_X,
            velocity_y: DEFAULT_VELOCITY_Y,
            color: DEFAULT_COLOR,
            final_crf: DEFAULT_FINAL_CRF,
            final_preset: DEFAULT_FINAL_PRESET.to_string(),
            intermediate_preset: DEFAULT_INTERMEDIATE_PRESET.to_string(),
            stage_timeout_secs: DEFAULT_STAGE_TIMEOUT_SECS,
            default_fps: DEFAULT_FPS,
        }
    }
}

impl OverlayConfig {
    /// Reads an overlay configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            CoreError::Config(format!("invalid config file '{}': {e}", path.display()))
        })?;
        log::debug!("Loaded overlay config from {}", path.display());
        Ok(config)
    }

    /// Checks every field against its valid range.
    pub fn validate(&self) -> CoreResult<()> {
        if self.rect_width == 0 || self.rect_height == 0 {
            return Err(CoreError::Config(format!(
                "rectangle dimensions must be non-zero, got {}x{}",
                self.rect_width, self.rect_height
            )));
        }
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(CoreError::Config(format!(
                "opacity must be within [0, 1], got {}",
                self.opacity
            )));
        }
        if !self.rotation_period_secs.is_finite() || self.rotation_period_secs <= 0.0 {
            return Err(CoreError::Config(format!(
                "rotation period must be positive, got {}",
                self.rotation_period_secs
            )));
        }
        if !self.velocity_x.is_finite() || !self.velocity_y.is_finite() {
            return Err(CoreError::Config("velocity must be finite".to_string()));
        }
        if self.final_crf > MAX_CRF {
            return Err(CoreError::Config(format!(
                "final CRF must be within 0-{MAX_CRF}, got {}",
                self.final_crf
            )));
        }
        if self.final_preset.trim().is_empty() || self.intermediate_preset.trim().is_empty() {
            return Err(CoreError::Config("encoder presets must not be empty".to_string()));
        }
        if self.stage_timeout_secs == 0 {
            return Err(CoreError::Config("stage timeout must be non-zero".to_string()));
        }
        if !self.default_fps.is_finite() || self.default_fps <= 0.0 {
            return Err(CoreError::Config(format!(
                "default fps must be positive, got {}",
                self.default_fps
            )));
        }
        Ok(())
    }

    /// Half the diagonal of the unrotated rectangle.
    ///
    /// A rotated rectangle never extends further than this from its center,
    /// which makes it the collision margin for the physics.
    pub fn half_diagonal(&self) -> f64 {
        let w = f64::from(self.rect_width);
        let h = f64::from(self.rect_height);
        (w * w + h * h).sqrt() / 2.0
    }

    /// Stage timeout as a `Duration`.
    pub fn stage_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.stage_timeout_secs)
    }
}

/// Paths and settings of a single render job.
///
/// The output directory is owned by this job for its whole run; running two
/// jobs against the same directory at once is not supported.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Source video.
    pub input_path: PathBuf,

    /// Directory receiving the final video and the telemetry log.
    pub output_dir: PathBuf,

    /// Optional directory for the intermediate render (defaults to `output_dir`).
    pub temp_dir: Option<PathBuf>,

    /// Rectangle and encoder settings.
    pub overlay: OverlayConfig,
}

impl JobConfig {
    /// Creates a job with default overlay settings.
    pub fn new(input_path: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            input_path,
            output_dir,
            temp_dir: None,
            overlay: OverlayConfig::default(),
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.input_path.as_os_str().is_empty() {
            return Err(CoreError::Config("input path must not be empty".to_string()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(CoreError::Config("output directory must not be empty".to_string()));
        }
        self.overlay.validate()
    }

    /// Location of the final video.
    pub fn final_output_path(&self) -> PathBuf {
        self.output_dir.join(OVERLAY_VIDEO_FILENAME)
    }

    /// Location of the telemetry CSV.
    pub fn telemetry_path(&self) -> PathBuf {
        self.output_dir.join(TELEMETRY_FILENAME)
    }
}
