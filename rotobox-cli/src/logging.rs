// ============================================================================
// rotobox-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: console and per-run log file via fern
//
// Console output is terse (level + message). When a log directory is known,
// every record is also written with a timestamp and target to
// `<log_dir>/rotobox_<YYYYMMDD_HHMMSS>.log`.

use anyhow::Context;
use log::LevelFilter;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CliResult;

/// Target of the render loop's per-frame progress lines.
const PIPELINE_TARGET: &str = "rotobox_core::pipeline";

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Log file path for a run started now.
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("rotobox_{}.log", get_timestamp()))
}

#[derive(Debug, Clone)]
pub struct LogOptions {
    pub level: LevelFilter,
    pub log_dir: Option<PathBuf>,
    /// Keep render progress lines off the console while a progress bar is drawn.
    pub progress_bar: bool,
}

/// Installs the global logger. Returns the log file path, if one was opened.
pub fn init_logging(options: &LogOptions) -> CliResult<Option<PathBuf>> {
    let console_pipeline_level = if options.progress_bar {
        LevelFilter::Warn.min(options.level)
    } else {
        options.level
    };

    let console = fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("{:<5} {}", record.level(), message)))
        .level_for(PIPELINE_TARGET, console_pipeline_level)
        .chain(std::io::stderr());

    let mut dispatch = fern::Dispatch::new().level(options.level).chain(console);

    let mut log_path = None;
    if let Some(dir) = &options.log_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory '{}'", dir.display()))?;
        let path = log_file_path(dir);
        let file = fern::log_file(&path)
            .with_context(|| format!("Failed to open log file '{}'", path.display()))?;
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{} {:<5} [{}] {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                        record.level(),
                        record.target(),
                        message
                    ))
                })
                .chain(file),
        );
        log_path = Some(path);
    }

    dispatch.apply().context("Logger already initialised")?;
    Ok(log_path)
}
