// ============================================================================
// rotobox-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for JobConfig
//
// Fluent construction of a JobConfig. Paths are required; every overlay and
// encoder setting starts at its default and can be overridden one at a time.
// `build` validates the result so an invalid job never reaches the pipeline.

use std::path::PathBuf;

use super::{JobConfig, OverlayConfig};
use crate::error::{CoreError, CoreResult};

/// Builder for creating JobConfig instances.
///
/// # Examples
///
/// ```rust
/// use rotobox_core::config::JobConfigBuilder;
/// use std::path::PathBuf;
///
/// let job = JobConfigBuilder::new()
///     .input_path(PathBuf::from("/videos/clip.mp4"))
///     .output_dir(PathBuf::from("/videos/out"))
///     .opacity(0.5)
///     .rect_size(160, 90)
///     .build()
///     .unwrap();
/// assert_eq!(job.overlay.rect_width, 160);
/// ```
#[derive(Debug, Clone, Default)]
pub struct JobConfigBuilder {
    // Required fields
    input_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,

    // Optional directory fields
    temp_dir: Option<PathBuf>,

    // Overlay settings, defaults until overridden
    overlay: OverlayConfig,
}

impl JobConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source video.
    pub fn input_path(mut self, input_path: PathBuf) -> Self {
        self.input_path = Some(input_path);
        self
    }

    /// Sets the directory receiving the final video and telemetry.
    pub fn output_dir(mut self, output_dir: PathBuf) -> Self {
        self.output_dir = Some(output_dir);
        self
    }

    /// Sets the directory for the intermediate render.
    pub fn temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.temp_dir = Some(temp_dir);
        self
    }

    /// Replaces all overlay settings at once, e.g. with values loaded from JSON.
    pub fn overlay(mut self, overlay: OverlayConfig) -> Self {
        self.overlay = overlay;
        self
    }

    /// Sets the rectangle dimensions in pixels.
    pub fn rect_size(mut self, width: u32, height: u32) -> Self {
        self.overlay.rect_width = width;
        self.overlay.rect_height = height;
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.overlay.opacity = opacity;
        self
    }

    /// Sets the seconds per full rotation.
    pub fn rotation_period_secs(mut self, secs: f64) -> Self {
        self.overlay.rotation_period_secs = secs;
        self
    }

    /// Sets the initial velocity in pixels per frame.
    pub fn velocity(mut self, vx: f64, vy: f64) -> Self {
        self.overlay.velocity_x = vx;
        self.overlay.velocity_y = vy;
        self
    }

    pub fn color(mut self, color: [u8; 3]) -> Self {
        self.overlay.color = color;
        self
    }

    /// Sets the CRF of the quality pass (0-51, lower is higher quality).
    pub fn final_crf(mut self, crf: u8) -> Self {
        self.overlay.final_crf = crf;
        self
    }

    /// Sets the libx264 preset of the quality pass.
    pub fn final_preset(mut self, preset: impl Into<String>) -> Self {
        self.overlay.final_preset = preset.into();
        self
    }

    /// Sets the libx264 preset of the intermediate pass.
    pub fn intermediate_preset(mut self, preset: impl Into<String>) -> Self {
        self.overlay.intermediate_preset = preset.into();
        self
    }

    /// Sets the per-stage wall-clock timeout in seconds.
    pub fn stage_timeout_secs(mut self, secs: u64) -> Self {
        self.overlay.stage_timeout_secs = secs;
        self
    }

    /// Builds and validates the JobConfig.
    pub fn build(self) -> CoreResult<JobConfig> {
        let input_path = self
            .input_path
            .ok_or_else(|| CoreError::Config("input path is required".to_string()))?;
        let output_dir = self
            .output_dir
            .ok_or_else(|| CoreError::Config("output directory is required".to_string()))?;

        let job = JobConfig {
            input_path,
            output_dir,
            temp_dir: self.temp_dir,
            overlay: self.overlay,
        };
        job.validate()?;
        Ok(job)
    }
}
