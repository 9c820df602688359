//! Pre-flight checks for inputs and the external toolchain.
//!
//! These run before a job starts so that a missing binary or a wrong input
//! path is reported up front instead of as a failed stage.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::error::{CoreError, CoreResult, Stage, command_failed_error};
use crate::external::check_dependency;
use crate::external::command::run_with_timeout;
use crate::utils::has_mp4_extension;

/// Time allowed for `ffmpeg -encoders`.
const ENCODER_LIST_TIMEOUT: Duration = Duration::from_secs(30);

/// Encoder both render passes rely on.
pub const REQUIRED_ENCODER: &str = "libx264";

/// Checks that `path` is an existing `.mp4` file.
pub fn validate_input_video(path: &Path) -> CoreResult<()> {
    if !path.exists() {
        return Err(CoreError::PathError(format!(
            "input video not found: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(CoreError::PathError(format!(
            "input is not a file: {}",
            path.display()
        )));
    }
    if !has_mp4_extension(path) {
        return Err(CoreError::PathError(format!(
            "input must be an .mp4 file: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Checks that ffmpeg and ffprobe are runnable and ffmpeg has libx264.
pub fn validate_environment() -> CoreResult<()> {
    check_dependency("ffmpeg")?;
    check_dependency("ffprobe")?;

    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-hide_banner", "-encoders"]);
    let output = run_with_timeout(&mut cmd, ENCODER_LIST_TIMEOUT, Stage::Probe)?;
    if !output.status.success() {
        return Err(command_failed_error(
            "ffmpeg -encoders",
            output.status,
            output.stderr_tail(3),
        ));
    }

    if !lists_encoder(&output.stdout, REQUIRED_ENCODER) {
        return Err(CoreError::DependencyNotFound(format!(
            "ffmpeg encoder {REQUIRED_ENCODER}"
        )));
    }
    log::debug!("Environment OK: ffmpeg, ffprobe, {REQUIRED_ENCODER}");
    Ok(())
}

/// Whether `ffmpeg -encoders` output contains an encoder named `name`.
///
/// Lines look like ` V....D libx264   libx264 H.264 / AVC ...`.
fn lists_encoder(listing: &str, name: &str) -> bool {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|encoder| encoder == name)
}
