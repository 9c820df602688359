//! Core library for the rotating rectangle overlay pipeline.
//!
//! Decodes a video, draws a moving, rotating, semi-transparent rectangle on
//! every frame, re-encodes it with the original audio, and compares the
//! compression metrics of the result against the source.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use rotobox_core::{FfmpegBackend, JobConfigBuilder, compare, render_overlay, write_comparison};
//! use std::path::PathBuf;
//!
//! let job = JobConfigBuilder::new()
//!     .input_path(PathBuf::from("/videos/clip.mp4"))
//!     .output_dir(PathBuf::from("/videos/out"))
//!     .build()
//!     .unwrap();
//!
//! let backend = FfmpegBackend::from_config(&job.overlay);
//! let outcome = render_overlay(&backend, &job, |_| {}).unwrap();
//!
//! let comparison = compare(&backend, &job.input_path, &outcome.output_path).unwrap();
//! write_comparison(&job.output_dir, &comparison).unwrap();
//! ```

pub mod comparator;
pub mod compositor;
pub mod config;
pub mod error;
pub mod external;
pub mod physics;
pub mod pipeline;
pub mod remux;
pub mod telemetry;
pub mod temp_files;
pub mod utils;
pub mod validation;

// Re-exports for public API
pub use comparator::{
    CompressionComparison, CompressionDelta, CompressionMetricSet, MetricDelta, compare,
    compare_metrics, get_metrics, write_comparison,
};
pub use compositor::{RectangleStyle, draw_rotated_rectangle, rectangle_corners};
pub use config::{JobConfig, JobConfigBuilder, OverlayConfig};
pub use error::{CoreError, CoreResult, ErrorCategory, Stage};
pub use external::{
    ContainerMetadata, EncodeTarget, FfmpegBackend, FfprobeProbe, FrameSink, FrameSource,
    MediaBackend, MetadataProbe,
};
pub use physics::{FrameGeometry, PhysicsParams, RectanglePhysics, RectangleState, step};
pub use pipeline::{RenderOutcome, RenderProgress, render_overlay};
pub use remux::{RemuxRequest, build_remux_args};
pub use telemetry::{RenderLogRow, TelemetryLog};
pub use utils::{format_bytes, format_duration};
pub use validation::{validate_environment, validate_input_video};
