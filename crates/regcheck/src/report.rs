//! Console report for a suite run.
//!
//! ```text
//! ✔  adds two numbers
//! ✖  subtracts
//!   Expected: $1 = 9
//!   Actual: $1 = 8
//! ✖  divides by zero
//!   MIPS emulator internal error.
//!   Division by zero
//!
//! Test Summary: 1 passed, 1 failed, 1 errored (total: 3)
//! ```

use std::io::{self, Write};

use regcheck_core::{CaseOutcome, CaseResult, Mismatch, RunSummary, SuiteRun};

/// Printed when the suite has no test cases.
pub const NO_TESTS_MESSAGE: &str = "No tests to run";

/// Glyph for a passing case.
pub const SUCCESS_MARK: &str = "✔";

/// Glyph for a failing or erroring case.
pub const FAILURE_MARK: &str = "✖";

const INDENT: &str = "  ";

/// Formats one case as its status line plus any indented detail block.
#[must_use]
pub fn format_case(result: &CaseResult) -> String {
    let detail: Vec<String> = match &result.outcome {
        CaseOutcome::Success => return format!("{SUCCESS_MARK}  {}", result.name),
        CaseOutcome::Failure(mismatches) => mismatches.iter().map(format_mismatch).collect(),
        CaseOutcome::RuntimeError(message) => message
            .lines()
            .map(|line| format!("{INDENT}{line}"))
            .collect(),
    };

    let mut lines = vec![format!("{FAILURE_MARK}  {}", result.name)];
    lines.extend(detail);
    lines.join("\n")
}

fn format_mismatch(mismatch: &Mismatch) -> String {
    let actual = mismatch
        .actual
        .map_or_else(|| "missing".to_string(), |value| value.to_string());
    format!(
        "{INDENT}Expected: ${reg} = {expected}\n{INDENT}Actual: ${reg} = {actual}",
        reg = mismatch.register,
        expected = mismatch.expected,
    )
}

/// Formats the closing summary line.
#[must_use]
pub fn format_summary(summary: &RunSummary) -> String {
    format!("Test Summary: {summary} (total: {})", summary.total)
}

/// Writes every case line, a blank line, and the summary to `out`.
///
/// # Errors
///
/// Returns any error from writing to `out`.
pub fn write_report(out: &mut impl Write, run: &SuiteRun) -> io::Result<()> {
    for result in &run.results {
        writeln!(out, "{}", format_case(result))?;
    }
    writeln!(out)?;
    writeln!(out, "{}", format_summary(&run.summary()))?;
    out.flush()
}
