// ============================================================================
// rotobox-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: result alias and exit codes
//
// Commands return `anyhow` errors so context can be layered on top of the
// core's `CoreError`. The process exit code is derived from the category of
// the underlying core error, when there is one.

use rotobox_core::{CoreError, ErrorCategory};

/// Result type for CLI commands.
pub type CliResult<T> = anyhow::Result<T>;

/// Exit code for errors without a core category (argument problems, I/O in
/// the CLI itself).
pub const EXIT_GENERAL: u8 = 1;

/// Maps a command error to a process exit code.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<CoreError>().map(CoreError::category) {
        Some(ErrorCategory::Configuration) => 2,
        Some(ErrorCategory::Source) => 3,
        Some(ErrorCategory::Encode) => 4,
        Some(ErrorCategory::Remux) => 5,
        Some(ErrorCategory::Probe) => 6,
        Some(ErrorCategory::Io) => 7,
        None => EXIT_GENERAL,
    }
}

/// Follow-up advice printed after the error, if any applies.
pub fn error_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.downcast_ref::<CoreError>()
        .filter(|e| e.is_timeout())
        .map(|_| "a stage hit its time limit; pass a larger --timeout for long inputs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn core_categories_get_distinct_codes() {
        let err = anyhow::Error::from(CoreError::Config("bad opacity".into()));
        assert_eq!(exit_code(&err), 2);

        let err = anyhow::Error::from(CoreError::Remux("muxer failed".into()));
        assert_eq!(exit_code(&err), 5);
    }

    #[test]
    fn context_does_not_hide_the_category() {
        let result: Result<(), CoreError> = Err(CoreError::Source("truncated".into()));
        let err = result.context("Rendering failed").unwrap_err();
        assert_eq!(exit_code(&err), 3);
    }

    #[test]
    fn timeouts_suggest_a_larger_limit() {
        let result: Result<(), CoreError> = Err(CoreError::StageTimeout {
            stage: rotobox_core::Stage::Encode,
            seconds: 600,
        });
        let err = result.context("Rendering failed").unwrap_err();
        assert!(error_hint(&err).is_some_and(|h| h.contains("--timeout")));

        let err = anyhow::Error::from(CoreError::Encode("x264 missing".into()));
        assert_eq!(error_hint(&err), None);
    }

    #[test]
    fn foreign_errors_use_the_general_code() {
        assert_eq!(exit_code(&anyhow::anyhow!("nope")), EXIT_GENERAL);
    }
}
