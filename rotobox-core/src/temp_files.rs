//! Temporary file management utilities.
//!
//! The intermediate render lives in a scratch directory created with the
//! tempfile crate, so it is removed when the directory handle is dropped,
//! including when the job fails part way.

use crate::config::JobConfig;
use crate::error::CoreResult;
use std::path::{Path, PathBuf};
use tempfile::{Builder as TempFileBuilder, TempDir};

/// File name of the intermediate render inside the scratch directory.
pub const INTERMEDIATE_FILENAME: &str = "intermediate.mkv";

/// Creates a temporary directory with prefix. Auto-cleaned when dropped.
///
/// Placed in `temp_dir` when the job sets one, otherwise in the output directory.
pub fn create_temp_dir(config: &JobConfig, prefix: &str) -> CoreResult<TempDir> {
    let temp_base_dir = config.temp_dir.as_ref().unwrap_or(&config.output_dir);
    std::fs::create_dir_all(temp_base_dir)?;

    Ok(TempFileBuilder::new()
        .prefix(prefix)
        .tempdir_in(temp_base_dir)?)
}

/// Path of the intermediate render inside `dir`. Does not create the file.
pub fn intermediate_path(dir: &Path) -> PathBuf {
    dir.join(INTERMEDIATE_FILENAME)
}
