//! Core library for regcheck: run JSON-described register tests against a
//! program executed inside an external instruction-set emulator.

/// Optional preprocessing step producing the executable under test.
pub mod build;
pub use build::{build_executable, default_destination, prepare_executable};

/// Run-time knobs shared by every test case.
pub mod config;
pub use config::{MismatchPolicy, RunConfig};

/// Register-dump and internal-error scraping from runtime output.
pub mod dump;
pub use dump::{find_internal_error, parse_register_dump, RegisterDump, INTERNAL_ERROR_HEADER};

/// Error taxonomy for loading, building and process execution.
pub mod error;
pub use error::{BuildError, RunnerError, SuiteError, MISSING_RUNTIME_MESSAGE};

/// Per-case execution, classification and aggregation.
pub mod executor;
pub use executor::{
    classify, compare_registers, invocation_command, run_case, run_suite, CaseOutcome,
    CaseResult, Mismatch, RunSummary, SuiteRun, NO_REGISTERS_MESSAGE,
};

/// External process execution behind a replaceable trait.
pub mod process;
pub use process::{ProcessOutput, ProcessRunner, ShellRunner};

/// Suite descriptor model and loader.
pub mod suite;
pub use suite::{
    load_suite, parse_suite, LoadedSuite, ParseRegisterIndexError, RegisterIndex, TestCase,
    TestSuite,
};
