// ============================================================================
// rotobox-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Core error type and classification
//
// Every fallible operation in rotobox-core returns `CoreResult<T>`. Errors are
// grouped into the categories a caller needs to act on: configuration
// mistakes, a source that cannot be read, encode stages that fail or time
// out, and the final remux.

use std::fmt;
use std::process::ExitStatus;
use thiserror::Error;

/// External stage a timeout or failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Container/stream metadata probing (`ffprobe`).
    Probe,
    /// Decoding the input into raw frames.
    Decode,
    /// The fast intermediate encode fed by the render loop.
    Encode,
    /// The quality-pass re-encode with audio remux.
    Remux,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Probe => "probe",
            Stage::Decode => "decode",
            Stage::Encode => "intermediate encode",
            Stage::Remux => "remux",
        };
        f.write_str(name)
    }
}

/// Coarse classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Source,
    Encode,
    Remux,
    Probe,
    Io,
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("{stage} stage timed out after {seconds}s")]
    StageTimeout { stage: Stage, seconds: u64 },

    #[error("Remux failed: {0}")]
    Remux(String),

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, #[source] std::io::Error),

    #[error("Command '{cmd}' failed with status {status}: {stderr}")]
    CommandFailed {
        cmd: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Required dependency '{0}' not found")]
    DependencyNotFound(String),

    #[error("Path error: {0}")]
    PathError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl CoreError {
    /// Maps the error onto the category a caller reports it under.
    ///
    /// Timeouts are classified by the stage they interrupted: probe and
    /// decode timeouts are source problems, encode and remux timeouts are
    /// encode problems.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::Config(_) => ErrorCategory::Configuration,
            CoreError::Source(_) => ErrorCategory::Source,
            CoreError::Encode(_) => ErrorCategory::Encode,
            CoreError::StageTimeout { stage, .. } => match stage {
                Stage::Probe | Stage::Decode => ErrorCategory::Source,
                Stage::Encode | Stage::Remux => ErrorCategory::Encode,
            },
            CoreError::Remux(_) => ErrorCategory::Remux,
            CoreError::Probe(_) => ErrorCategory::Probe,
            CoreError::CommandStart(..)
            | CoreError::CommandFailed { .. }
            | CoreError::DependencyNotFound(_) => ErrorCategory::Encode,
            CoreError::PathError(_)
            | CoreError::Io(_)
            | CoreError::Json(_)
            | CoreError::Csv(_) => ErrorCategory::Io,
        }
    }

    /// Returns `true` for timeouts of any stage.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CoreError::StageTimeout { .. })
    }
}

/// Result type for rotobox-core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Builds a [`CoreError::CommandStart`] for a command that could not be spawned.
pub fn command_start_error(cmd: impl Into<String>, err: std::io::Error) -> CoreError {
    CoreError::CommandStart(cmd.into(), err)
}

/// Builds a [`CoreError::CommandFailed`] for a command that exited unsuccessfully.
pub fn command_failed_error(
    cmd: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed {
        cmd: cmd.into(),
        status,
        stderr: stderr.into(),
    }
}
