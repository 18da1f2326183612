//! regcheck command-line front end.

/// Argument definitions and logging setup.
pub mod cli;
/// Console report formatting.
pub mod report;

#[cfg(test)]
use serde_json as _;
#[cfg(test)]
use tempfile as _;
