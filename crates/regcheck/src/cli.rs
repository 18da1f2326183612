//! Command-line interface parsing and logging setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use log::LevelFilter;
use regcheck_core::{MismatchPolicy, RunConfig};

/// Top-level arguments. `test` is the default subcommand, so
/// `regcheck <program> <test-file>` and `regcheck test <program> <test-file>`
/// are equivalent.
#[derive(Parser, Debug)]
#[command(
    name = "regcheck",
    version,
    about,
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
pub struct Cli {
    /// Explicit subcommand.
    #[command(subcommand)]
    pub command: Option<Command>,
    /// Arguments for the implicit `test` subcommand.
    #[command(flatten)]
    pub test: TestArgs,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Test your program against the supplied test suite
    Test(TestArgs),
}

/// Arguments of the `test` subcommand.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct TestArgs {
    /// Program source, or the executable itself when the suite has no preprocessor
    #[arg(value_name = "PROGRAM", required = true)]
    pub program: Option<PathBuf>,
    /// JSON test suite descriptor
    #[arg(value_name = "TEST_FILE", required = true)]
    pub test_file: Option<PathBuf>,
    /// Kill a test case's runtime after this many seconds and report an error
    #[arg(long, value_name = "SECONDS", value_parser = parse_timeout)]
    pub timeout: Option<Duration>,
    /// Report every mismatching register instead of only the first
    #[arg(long)]
    pub all_mismatches: bool,
    /// Exit with status 0 even when test cases fail
    #[arg(long)]
    pub exit_zero: bool,
    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// A fully resolved `test` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TestInvocation {
    /// Program source or executable path.
    pub program: PathBuf,
    /// Suite descriptor path.
    pub test_file: PathBuf,
    /// Executor configuration.
    pub config: RunConfig,
    /// Whether failing cases still exit with status 0.
    pub exit_zero: bool,
    /// Whether debug logging is enabled.
    pub verbose: bool,
}

impl Cli {
    /// Resolves the implicit or explicit `test` arguments.
    ///
    /// The paths are `Option` only because the same [`TestArgs`] is flattened
    /// at the top level, where they are absent once `test` is given
    /// explicitly. A [`Cli`] produced by [`Parser::parse`] always carries both
    /// paths; a hand-built one may not.
    ///
    /// # Errors
    ///
    /// Returns a [`clap::Error`] of kind
    /// [`ErrorKind::MissingRequiredArgument`] if a path is missing.
    pub fn into_invocation(self) -> Result<TestInvocation, clap::Error> {
        let args = match self.command {
            Some(Command::Test(args)) => args,
            None => self.test,
        };
        args.into_invocation()
    }
}

impl TestArgs {
    fn into_invocation(self) -> Result<TestInvocation, clap::Error> {
        let (Some(program), Some(test_file)) = (self.program, self.test_file) else {
            return Err(Cli::command().error(
                ErrorKind::MissingRequiredArgument,
                "<PROGRAM> and <TEST_FILE> are both required",
            ));
        };

        let mut config = RunConfig::default();
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        if self.all_mismatches {
            config = config.with_mismatch_policy(MismatchPolicy::All);
        }

        Ok(TestInvocation {
            program,
            test_file,
            config,
            exit_zero: self.exit_zero,
            verbose: self.verbose,
        })
    }
}

fn parse_timeout(text: &str) -> Result<Duration, String> {
    let seconds: f64 = text
        .parse()
        .map_err(|_| format!("invalid number of seconds '{text}'"))?;
    if seconds <= 0.0 {
        return Err("timeout must be greater than zero".to_string());
    }
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("invalid timeout '{text}': {e}"))
}

/// Initializes `env_logger` on stderr.
///
/// The default level is `warn`, or `debug` when `verbose` is set; `RUST_LOG`
/// overrides either.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}
