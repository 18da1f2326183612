//! Optional preprocessing step that produces the executable under test.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BuildError;
use crate::process::ProcessRunner;
use crate::suite::TestSuite;

/// Default output path: the source's directory joined with its file stem.
#[must_use]
pub fn default_destination(source: &Path) -> PathBuf {
    let stem = source.file_stem().unwrap_or_default();
    source
        .parent()
        .map_or_else(|| PathBuf::from(stem), |dir| dir.join(stem))
}

/// Resolves the executable every test case runs against.
///
/// Without a preprocessor this is `source` itself. Otherwise the source bytes
/// are piped through the preprocessor and its stdout is written to the
/// suite's `destination`, or to [`default_destination`] when unset.
///
/// # Errors
///
/// Returns [`BuildError`] if the source cannot be read, the preprocessor
/// fails to launch or exits nonzero, or the output cannot be written.
pub fn prepare_executable(
    suite: &TestSuite,
    source: &Path,
    runner: &impl ProcessRunner,
) -> Result<PathBuf, BuildError> {
    let Some(preprocessor) = suite.preprocessor.as_deref() else {
        return Ok(source.to_path_buf());
    };

    let destination = suite
        .destination
        .clone()
        .unwrap_or_else(|| default_destination(source));
    build_executable(preprocessor, source, &destination, runner)?;
    Ok(destination)
}

/// Pipes `source` through `preprocessor` and writes its stdout to
/// `destination`, creating or overwriting the file.
///
/// # Errors
///
/// See [`prepare_executable`].
pub fn build_executable(
    preprocessor: &str,
    source: &Path,
    destination: &Path,
    runner: &impl ProcessRunner,
) -> Result<(), BuildError> {
    let input = fs::read(source).map_err(|source_err| BuildError::ReadSource {
        path: source.to_path_buf(),
        source: source_err,
    })?;

    if destination == source {
        log::warn!(
            "build output {} overwrites its own source",
            destination.display()
        );
    }
    log::debug!(
        "building {} -> {} with `{preprocessor}`",
        source.display(),
        destination.display()
    );

    let output = runner.run(preprocessor, &input, None)?;
    if !output.success() {
        return Err(BuildError::PreprocessorFailed {
            command: preprocessor.to_string(),
            code: output.exit_code,
            stderr: output.stderr_text(),
        });
    }

    fs::write(destination, &output.stdout).map_err(|source| BuildError::WriteExecutable {
        path: destination.to_path_buf(),
        source,
    })
}
