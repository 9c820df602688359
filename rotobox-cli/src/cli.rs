// ============================================================================
// rotobox-cli/src/cli.rs
// ============================================================================
//
// COMMAND-LINE INTERFACE: argument structures parsed with clap
//
// Three subcommands share one set of global logging flags:
// - `render`: draw the rotating rectangle over an input video
// - `compare`: compare compression metrics of two videos
// - `run`: render, then compare the result against the source

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Rotobox: rotating rectangle overlay and compression impact analysis",
    long_about = "Draws a moving, rotating, semi-transparent rectangle over every frame of a \
                  video, re-encodes it with the original audio, and measures how the overlay \
                  changes file size and bitrate."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level; takes precedence over --verbose
    #[arg(long, global = true, value_enum, value_name = "LEVEL", env = "ROTOBOX_LOG")]
    pub log_level: Option<LogLevel>,

    /// Directory for log files (defaults to OUTPUT_DIR/logs)
    #[arg(long, global = true, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Do not draw the render progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,
}

impl Cli {
    /// Effective console and file log level.
    pub fn level_filter(&self) -> LevelFilter {
        match self.log_level {
            Some(level) => level.into(),
            None if self.verbose => LevelFilter::Debug,
            None => LevelFilter::Info,
        }
    }

    /// Where the run log goes, if anywhere.
    pub fn effective_log_dir(&self) -> Option<PathBuf> {
        self.log_dir.clone().or_else(|| {
            self.command
                .output_dir()
                .map(|dir| dir.join(crate::config::DEFAULT_LOG_SUBDIR))
        })
    }

    pub fn show_progress(&self) -> bool {
        !self.no_progress && self.command.renders()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the rectangle overlay onto a video
    Render(RenderArgs),
    /// Compare compression metrics of an original and a modified video
    Compare(CompareArgs),
    /// Render the overlay, then compare the result against the input
    Run(RenderArgs),
}

impl Commands {
    /// Output directory named on the command line, if the command has one.
    pub fn output_dir(&self) -> Option<&Path> {
        match self {
            Commands::Render(args) | Commands::Run(args) => Some(&args.output_dir),
            Commands::Compare(args) => args.output_dir.as_deref(),
        }
    }

    fn renders(&self) -> bool {
        matches!(self, Commands::Render(_) | Commands::Run(_))
    }
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Input .mp4 video
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_VIDEO")]
    pub input_path: PathBuf,

    /// Directory for overlay_video.mp4 and rectangle_log.csv
    #[arg(short = 'o', long = "output", required = true, value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Directory for the intermediate encode (defaults to OUTPUT_DIR)
    #[arg(long, value_name = "TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    #[command(flatten)]
    pub overlay: OverlayArgs,
}

/// Overlay settings. Flags override values from `--config`.
#[derive(Args, Debug, Clone, Default)]
pub struct OverlayArgs {
    /// JSON file with overlay settings
    #[arg(long = "config", value_name = "CONFIG_JSON")]
    pub config_file: Option<PathBuf>,

    /// Rectangle width in pixels
    #[arg(long, value_name = "PIXELS")]
    pub rect_width: Option<u32>,

    /// Rectangle height in pixels
    #[arg(long, value_name = "PIXELS")]
    pub rect_height: Option<u32>,

    /// Fill opacity in [0, 1]
    #[arg(long, value_name = "ALPHA")]
    pub opacity: Option<f64>,

    /// Seconds per full turn
    #[arg(long, value_name = "SECONDS")]
    pub rotation_period: Option<f64>,

    /// Horizontal velocity in pixels per frame
    #[arg(long, value_name = "PX", allow_hyphen_values = true)]
    pub velocity_x: Option<f64>,

    /// Vertical velocity in pixels per frame
    #[arg(long, value_name = "PX", allow_hyphen_values = true)]
    pub velocity_y: Option<f64>,

    /// Fill color as R,G,B (e.g. 255,0,0)
    #[arg(long, value_delimiter = ',', value_name = "R,G,B")]
    pub color: Option<Vec<u8>>,

    /// libx264 CRF for the final encode (0-51, lower is better quality)
    #[arg(long, value_name = "CRF", value_parser = clap::value_parser!(u8).range(0..=51))]
    pub crf: Option<u8>,

    /// libx264 preset for the final encode
    #[arg(long, value_name = "PRESET")]
    pub preset: Option<String>,

    /// libx264 preset for the lossless intermediate encode
    #[arg(long, value_name = "PRESET")]
    pub intermediate_preset: Option<String>,

    /// Per-stage time limit in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    /// Source video
    #[arg(long, required = true, value_name = "ORIGINAL")]
    pub original: PathBuf,

    /// Re-encoded video
    #[arg(long, required = true, value_name = "MODIFIED")]
    pub modified: PathBuf,

    /// Also write compression_comparison.json here
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Probe time limit in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_render_with_overrides() {
        let cli = Cli::parse_from([
            "rotobox",
            "render",
            "-i",
            "clip.mp4",
            "-o",
            "out",
            "--opacity",
            "0.5",
            "--velocity-x",
            "-4",
            "--color",
            "0,255,0",
            "--crf",
            "23",
        ]);
        let Commands::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(args.input_path, PathBuf::from("clip.mp4"));
        assert_eq!(args.output_dir, PathBuf::from("out"));
        assert_eq!(args.overlay.opacity, Some(0.5));
        assert_eq!(args.overlay.velocity_x, Some(-4.0));
        assert_eq!(args.overlay.color, Some(vec![0, 255, 0]));
        assert_eq!(args.overlay.crf, Some(23));
        assert!(args.overlay.rect_width.is_none());
    }

    #[test]
    fn crf_out_of_range_is_rejected() {
        let result = Cli::try_parse_from(["rotobox", "run", "-i", "a.mp4", "-o", "out", "--crf", "60"]);
        assert!(result.is_err());
    }

    #[test]
    fn log_dir_defaults_under_output_dir() {
        let cli = Cli::parse_from(["rotobox", "run", "-i", "a.mp4", "-o", "out"]);
        assert_eq!(cli.effective_log_dir(), Some(PathBuf::from("out/logs")));
        assert!(cli.show_progress());

        let cli = Cli::parse_from(["rotobox", "compare", "--original", "a.mp4", "--modified", "b.mp4"]);
        assert_eq!(cli.effective_log_dir(), None);
        assert!(!cli.show_progress());
    }

    #[test]
    fn log_level_beats_verbose() {
        let cli = Cli::parse_from(["rotobox", "-v", "render", "-i", "a.mp4", "-o", "o"]);
        assert_eq!(cli.level_filter(), LevelFilter::Debug);

        let cli = Cli::parse_from(["rotobox", "-v", "--log-level", "warn", "render", "-i", "a.mp4", "-o", "o"]);
        assert_eq!(cli.level_filter(), LevelFilter::Warn);
    }
}
