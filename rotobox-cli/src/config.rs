// rotobox-cli/src/config.rs
//
// Turns command-line arguments into core configuration. Values come from
// the defaults, then an optional JSON file, then individual flags.

use anyhow::{Context, bail};
use rotobox_core::{JobConfig, JobConfigBuilder, OverlayConfig};

use crate::cli::{OverlayArgs, RenderArgs};
use crate::error::CliResult;

/// Log directory created under the output directory when `--log-dir` is absent.
pub const DEFAULT_LOG_SUBDIR: &str = "logs";

/// Resolves overlay settings from `--config` and the override flags.
pub fn overlay_from_args(args: &OverlayArgs) -> CliResult<OverlayConfig> {
    let mut overlay = match &args.config_file {
        Some(path) => OverlayConfig::from_json_file(path)
            .with_context(|| format!("Failed to load overlay config '{}'", path.display()))?,
        None => OverlayConfig::default(),
    };

    if let Some(width) = args.rect_width {
        overlay.rect_width = width;
    }
    if let Some(height) = args.rect_height {
        overlay.rect_height = height;
    }
    if let Some(opacity) = args.opacity {
        overlay.opacity = opacity;
    }
    if let Some(period) = args.rotation_period {
        overlay.rotation_period_secs = period;
    }
    if let Some(vx) = args.velocity_x {
        overlay.velocity_x = vx;
    }
    if let Some(vy) = args.velocity_y {
        overlay.velocity_y = vy;
    }
    if let Some(color) = &args.color {
        overlay.color = parse_color(color)?;
    }
    if let Some(crf) = args.crf {
        overlay.final_crf = crf;
    }
    if let Some(preset) = &args.preset {
        overlay.final_preset = preset.clone();
    }
    if let Some(preset) = &args.intermediate_preset {
        overlay.intermediate_preset = preset.clone();
    }
    if let Some(timeout) = args.timeout {
        overlay.stage_timeout_secs = timeout;
    }
    Ok(overlay)
}

/// Builds and validates the render job.
pub fn job_from_args(args: &RenderArgs) -> CliResult<JobConfig> {
    let overlay = overlay_from_args(&args.overlay)?;
    let mut builder = JobConfigBuilder::new()
        .input_path(args.input_path.clone())
        .output_dir(args.output_dir.clone())
        .overlay(overlay);
    if let Some(dir) = &args.temp_dir {
        builder = builder.temp_dir(dir.clone());
    }
    Ok(builder.build()?)
}

fn parse_color(components: &[u8]) -> CliResult<[u8; 3]> {
    match components {
        [r, g, b] => Ok([*r, *g, *b]),
        _ => bail!(
            "--color expects exactly three components (R,G,B), got {}",
            components.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn render_args(overlay: OverlayArgs) -> RenderArgs {
        RenderArgs {
            input_path: PathBuf::from("clip.mp4"),
            output_dir: PathBuf::from("out"),
            temp_dir: None,
            overlay,
        }
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("overlay.json");
        fs::write(&path, r#"{"opacity": 0.2, "rect_width": 50, "final_crf": 30}"#).unwrap();

        let overlay = overlay_from_args(&OverlayArgs {
            config_file: Some(path),
            opacity: Some(0.9),
            color: Some(vec![1, 2, 3]),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(overlay.opacity, 0.9);
        assert_eq!(overlay.rect_width, 50);
        assert_eq!(overlay.final_crf, 30);
        assert_eq!(overlay.color, [1, 2, 3]);
        assert_eq!(overlay.rect_height, 100);
    }

    #[test]
    fn color_needs_three_components() {
        let err = overlay_from_args(&OverlayArgs {
            color: Some(vec![255, 0]),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("three components"));
    }

    #[test]
    fn invalid_overlay_fails_job_validation() {
        let err = job_from_args(&render_args(OverlayArgs {
            opacity: Some(1.5),
            ..Default::default()
        }))
        .unwrap_err();
        assert!(err.to_string().contains("opacity"));
    }

    #[test]
    fn temp_dir_is_passed_through() {
        let mut args = render_args(OverlayArgs::default());
        args.temp_dir = Some(PathBuf::from("/scratch"));
        let job = job_from_args(&args).unwrap();
        assert_eq!(job.temp_dir, Some(PathBuf::from("/scratch")));
        assert_eq!(job.overlay, OverlayConfig::default());
    }
}
