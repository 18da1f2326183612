//! CLI entry point for the regcheck binary.

use std::io;
use std::process;

use clap::Parser;
use env_logger as _;
use regcheck::cli::{init_logging, Cli, TestInvocation};
use regcheck::report::{write_report, NO_TESTS_MESSAGE};
use regcheck_core::{
    load_suite, prepare_executable, run_suite, LoadedSuite, ShellRunner, SuiteError,
};
#[cfg(test)]
use serde_json as _;
#[cfg(test)]
use tempfile as _;

/// Loads, builds and runs the suite, returning the process exit code.
fn run_test(invocation: &TestInvocation) -> Result<i32, SuiteError> {
    let suite = match load_suite(&invocation.test_file)? {
        LoadedSuite::Ready(suite) => suite,
        LoadedSuite::NoTests => {
            println!("{NO_TESTS_MESSAGE}");
            return Ok(0);
        }
    };

    let executable = prepare_executable(&suite, &invocation.program, &ShellRunner)?;
    let run = run_suite(&suite, &executable, &ShellRunner, &invocation.config);

    if let Err(e) = write_report(&mut io::stdout().lock(), &run) {
        log::warn!("failed to write report: {e}");
    }

    if run.all_passed() || invocation.exit_zero {
        Ok(0)
    } else {
        Ok(1)
    }
}

fn main() {
    let invocation = Cli::parse()
        .into_invocation()
        .unwrap_or_else(|error| error.exit());
    init_logging(invocation.verbose);

    let exit_code = match run_test(&invocation) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{error}");
            1
        }
    };

    process::exit(exit_code);
}
