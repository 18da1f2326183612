//! Error taxonomy for suite loading, building and process execution.
//!
//! Errors in this module abort a whole run. Per-case problems are not errors:
//! they are folded into [`crate::executor::CaseOutcome`] so that one broken
//! case never stops the others.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Message reported when the descriptor has no usable `runtime` string.
pub const MISSING_RUNTIME_MESSAGE: &str =
    "A runtime environment string, like \"mips.twoints\", is required";

/// Fatal error raised before any test case runs.
#[derive(Debug, Error)]
pub enum SuiteError {
    /// The suite file is missing, unreadable, or not well-formed JSON.
    #[error("{0}")]
    Parse(String),
    /// The suite parsed but a required field is absent or mistyped.
    #[error("{0}")]
    Validation(String),
    /// The optional build step failed.
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Failure of the preprocessing build step.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The program source could not be read.
    #[error("failed to read source {}: {source}", path.display())]
    ReadSource {
        /// Source path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The preprocessor could not be launched or its pipes failed.
    #[error(transparent)]
    Preprocessor(#[from] RunnerError),
    /// The preprocessor ran but exited unsuccessfully.
    #[error("preprocessor `{command}` exited with {}{}", describe_code(*code), describe_stderr(stderr))]
    PreprocessorFailed {
        /// The preprocessor command line.
        command: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Captured standard error text.
        stderr: String,
    },
    /// The built executable could not be written.
    #[error("failed to write executable {}: {source}", path.display())]
    WriteExecutable {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Failure to drive an external process to completion.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The shell could not be spawned.
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        /// The command line that was being launched.
        command: String,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Waiting on the process or collecting its output failed.
    #[error("I/O error while running `{command}`: {source}")]
    Io {
        /// The command line being run.
        command: String,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The process did not exit in time and was killed.
    #[error("`{command}` timed out after {:.3}s", timeout.as_secs_f64())]
    TimedOut {
        /// The command line that timed out.
        command: String,
        /// The limit that expired.
        timeout: Duration,
    },
}

fn describe_code(code: Option<i32>) -> String {
    code.map_or_else(|| "no exit code (terminated by signal)".to_string(), |c| format!("status {c}"))
}

fn describe_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{trimmed}")
    }
}
