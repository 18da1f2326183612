//! Test-case execution and classification.
//!
//! ## Execution Model
//!
//! 1. Every case runs `"<runtime> <executable>"` in its own process, with the
//!    case's input lines on stdin.
//! 2. The runtime's standard error is checked for the internal-error
//!    signature, then scraped into a [`RegisterDump`].
//! 3. Expected registers are compared in ascending index order.
//! 4. All cases run concurrently and all of them settle; results come back
//!    in suite order regardless of completion order.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::thread;

use crate::config::{MismatchPolicy, RunConfig};
use crate::dump::{find_internal_error, parse_register_dump, RegisterDump};
use crate::process::ProcessRunner;
use crate::suite::{RegisterIndex, TestCase, TestSuite};

/// Message for a runtime whose output holds no register tokens.
pub const NO_REGISTERS_MESSAGE: &str = "no register values found in runtime output";

/// One register that did not hold its expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// 1-based register index.
    pub register: RegisterIndex,
    /// Value from the suite.
    pub expected: i64,
    /// Value from the dump, or `None` if the dump was too short.
    pub actual: Option<u32>,
}

/// Terminal classification of a single test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    /// Every expected register matched.
    Success,
    /// At least one register mismatched. Never empty.
    Failure(Vec<Mismatch>),
    /// The runtime reported an internal error, or the case could not run.
    RuntimeError(String),
}

impl CaseOutcome {
    /// Returns true for [`CaseOutcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Outcome of one named case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseResult {
    /// Case name from the suite.
    pub name: String,
    /// Classification.
    pub outcome: CaseOutcome,
}

/// Results of every case in suite order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteRun {
    /// One result per case.
    pub results: Vec<CaseResult>,
}

impl SuiteRun {
    /// Returns true if every case succeeded.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.outcome.is_success())
    }

    /// Returns counts for summary reporting.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total: self.results.len(),
            ..RunSummary::default()
        };
        for result in &self.results {
            match result.outcome {
                CaseOutcome::Success => summary.passed += 1,
                CaseOutcome::Failure(_) => summary.failed += 1,
                CaseOutcome::RuntimeError(_) => summary.errored += 1,
            }
        }
        summary
    }
}

/// Summary counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Cases that succeeded.
    pub passed: usize,
    /// Cases with register mismatches.
    pub failed: usize,
    /// Cases that hit a runtime error.
    pub errored: usize,
    /// All cases.
    pub total: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} errored",
            self.passed, self.failed, self.errored
        )
    }
}

/// Command line that runs `executable` under `runtime`.
#[must_use]
pub fn invocation_command(runtime: &str, executable: &Path) -> String {
    format!("{runtime} {}", executable.display())
}

/// Runs every case of `suite` against `executable` concurrently.
///
/// Each case gets its own thread and process. A case that fails, errors,
/// or panics never prevents the others from settling.
pub fn run_suite<R>(
    suite: &TestSuite,
    executable: &Path,
    runner: &R,
    config: &RunConfig,
) -> SuiteRun
where
    R: ProcessRunner + Sync,
{
    let command = invocation_command(&suite.runtime, executable);
    let command = command.as_str();

    let results: Vec<CaseResult> = thread::scope(|scope| {
        let handles: Vec<_> = suite
            .tests
            .iter()
            .map(|(name, case)| {
                let handle = scope.spawn(move || {
                    log::debug!("running `{name}`: {command}");
                    run_case(runner, command, case, config)
                });
                (name, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(name, handle)| CaseResult {
                name: name.clone(),
                outcome: handle.join().unwrap_or_else(|_| {
                    CaseOutcome::RuntimeError("test case panicked".to_string())
                }),
            })
            .collect()
    });

    SuiteRun { results }
}

/// Runs one case and classifies its outcome.
pub fn run_case(
    runner: &impl ProcessRunner,
    command: &str,
    case: &TestCase,
    config: &RunConfig,
) -> CaseOutcome {
    match runner.run(command, &case.stdin(), config.timeout) {
        Ok(output) => classify(&output.stderr_text(), case, config.mismatch_policy),
        Err(e) => CaseOutcome::RuntimeError(e.to_string()),
    }
}

/// Classifies a case from the runtime's standard error text.
#[must_use]
pub fn classify(stderr: &str, case: &TestCase, policy: MismatchPolicy) -> CaseOutcome {
    if !case.expects_error {
        if let Some(message) = find_internal_error(stderr) {
            return CaseOutcome::RuntimeError(message.to_string());
        }
    }

    let dump = parse_register_dump(stderr);
    if dump.is_empty() && !case.expected.is_empty() {
        return CaseOutcome::RuntimeError(NO_REGISTERS_MESSAGE.to_string());
    }

    let mismatches = compare_registers(&dump, &case.expected, policy);
    if mismatches.is_empty() {
        CaseOutcome::Success
    } else {
        CaseOutcome::Failure(mismatches)
    }
}

/// Compares expected registers against the dump in ascending index order.
#[must_use]
pub fn compare_registers(
    dump: &RegisterDump,
    expected: &BTreeMap<RegisterIndex, i64>,
    policy: MismatchPolicy,
) -> Vec<Mismatch> {
    let mut mismatches = expected.iter().filter_map(|(&register, &expected)| {
        let actual = dump.get(register);
        (actual.map(i64::from) != Some(expected)).then_some(Mismatch {
            register,
            expected,
            actual,
        })
    });

    match policy {
        MismatchPolicy::First => mismatches.next().into_iter().collect(),
        MismatchPolicy::All => mismatches.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RunnerError;
    use crate::process::ProcessOutput;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory runtime: computes stderr from stdin.
    struct FakeRuntime<F> {
        respond: F,
        seen: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl<F> FakeRuntime<F>
    where
        F: Fn(&str) -> String + Sync,
    {
        fn new(respond: F) -> Self {
            Self {
                respond,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl<F> ProcessRunner for FakeRuntime<F>
    where
        F: Fn(&str) -> String + Sync,
    {
        fn run(
            &self,
            command: &str,
            stdin: &[u8],
            _timeout: Option<Duration>,
        ) -> Result<ProcessOutput, RunnerError> {
            self.seen
                .lock()
                .unwrap()
                .push((command.to_string(), stdin.to_vec()));
            let input = String::from_utf8_lossy(stdin);
            Ok(ProcessOutput {
                stdout: Vec::new(),
                stderr: (self.respond)(&input).into_bytes(),
                exit_code: Some(0),
            })
        }
    }

    /// Sums the input lines into the first register, like a twoints program.
    fn adder(input: &str) -> String {
        let sum: u32 = input.lines().filter_map(|l| l.trim().parse::<u32>().ok()).sum();
        format!("$v0 = 0x{sum:08x}\n$v1 = 0x00000000\n")
    }

    fn index(i: usize) -> RegisterIndex {
        RegisterIndex::new(i).unwrap()
    }

    fn case(input: &[&str], expected: &[(usize, i64)]) -> TestCase {
        TestCase {
            input: input.iter().map(|s| (*s).to_string()).collect(),
            expected: expected.iter().map(|&(r, v)| (index(r), v)).collect(),
            expects_error: false,
        }
    }

    fn suite(tests: Vec<(&str, TestCase)>) -> TestSuite {
        TestSuite {
            runtime: "fake.mips".to_string(),
            preprocessor: None,
            destination: None,
            tests: tests
                .into_iter()
                .map(|(name, case)| (name.to_string(), case))
                .collect(),
        }
    }

    const INTERNAL_ERROR: &str =
        "MIPS emulator internal error.\nBad address in text read: 0x00000000\n0x00000008\n";

    #[test]
    fn matching_registers_succeed() {
        let runtime = FakeRuntime::new(adder);
        let outcome = run_case(
            &runtime,
            "fake.mips prog",
            &case(&["5", "3"], &[(1, 8)]),
            &RunConfig::default(),
        );
        assert_eq!(outcome, CaseOutcome::Success);
    }

    #[test]
    fn mismatch_reports_expected_and_actual() {
        let runtime = FakeRuntime::new(adder);
        let outcome = run_case(
            &runtime,
            "fake.mips prog",
            &case(&["5", "3"], &[(1, 9)]),
            &RunConfig::default(),
        );
        assert_eq!(
            outcome,
            CaseOutcome::Failure(vec![Mismatch {
                register: index(1),
                expected: 9,
                actual: Some(8),
            }])
        );
    }

    #[test]
    fn feeds_joined_input_to_invocation() {
        let runtime = FakeRuntime::new(adder);
        run_case(
            &runtime,
            "fake.mips prog",
            &case(&["5", "3"], &[]),
            &RunConfig::default(),
        );

        let seen = runtime.seen.lock().unwrap();
        assert_eq!(*seen, [("fake.mips prog".to_string(), b"5\n3".to_vec())]);
    }

    #[test]
    fn first_policy_reports_lowest_mismatching_register() {
        let dump = RegisterDump::new(vec![1, 2, 3, 4]);
        let expected = BTreeMap::from([(index(4), 40), (index(2), 20), (index(1), 1)]);

        let mismatches = compare_registers(&dump, &expected, MismatchPolicy::First);
        assert_eq!(
            mismatches,
            [Mismatch {
                register: index(2),
                expected: 20,
                actual: Some(2),
            }]
        );
    }

    #[test]
    fn all_policy_reports_every_mismatch() {
        let dump = RegisterDump::new(vec![1, 2, 3, 4]);
        let expected = BTreeMap::from([(index(4), 40), (index(2), 20), (index(1), 1)]);

        let mismatches = compare_registers(&dump, &expected, MismatchPolicy::All);
        let registers: Vec<_> = mismatches.iter().map(|m| m.register.get()).collect();
        assert_eq!(registers, [2, 4]);
    }

    #[test]
    fn register_past_end_of_dump_is_missing() {
        let dump = RegisterDump::new(vec![7]);
        let expected = BTreeMap::from([(index(3), 0)]);

        let mismatches = compare_registers(&dump, &expected, MismatchPolicy::First);
        assert_eq!(mismatches[0].actual, None);
    }

    #[test]
    fn negative_expectation_never_matches_unsigned_register() {
        let dump = RegisterDump::new(vec![0xffff_ffff]);
        let expected = BTreeMap::from([(index(1), -1)]);
        assert_eq!(
            compare_registers(&dump, &expected, MismatchPolicy::First).len(),
            1
        );

        let expected = BTreeMap::from([(index(1), 0xffff_ffff)]);
        assert!(compare_registers(&dump, &expected, MismatchPolicy::First).is_empty());
    }

    #[test]
    fn internal_error_short_circuits_regardless_of_expected() {
        for expected in [&[][..], &[(1, 8)][..], &[(1, 9), (2, 1)][..]] {
            let outcome = classify(INTERNAL_ERROR, &case(&[], expected), MismatchPolicy::All);
            assert_eq!(
                outcome,
                CaseOutcome::RuntimeError(
                    "MIPS emulator internal error.\nBad address in text read: 0x00000000"
                        .to_string()
                )
            );
        }
    }

    #[test]
    fn error_flag_allows_comparison_to_proceed() {
        let mut expect_trap = case(&[], &[(1, 0), (2, 8)]);
        expect_trap.expects_error = true;
        assert_eq!(
            classify(INTERNAL_ERROR, &expect_trap, MismatchPolicy::First),
            CaseOutcome::Success
        );

        expect_trap.expected = BTreeMap::from([(index(2), 9)]);
        assert!(matches!(
            classify(INTERNAL_ERROR, &expect_trap, MismatchPolicy::First),
            CaseOutcome::Failure(_)
        ));
    }

    #[test]
    fn error_flag_without_error_still_compares() {
        let mut flagged = case(&[], &[(1, 8)]);
        flagged.expects_error = true;
        assert_eq!(
            classify("0x00000008", &flagged, MismatchPolicy::First),
            CaseOutcome::Success
        );
    }

    #[test]
    fn empty_dump_is_runtime_error_when_registers_expected() {
        assert_eq!(
            classify("segfault\n", &case(&[], &[(1, 8)]), MismatchPolicy::First),
            CaseOutcome::RuntimeError(NO_REGISTERS_MESSAGE.to_string())
        );
        assert_eq!(
            classify("segfault\n", &case(&[], &[]), MismatchPolicy::First),
            CaseOutcome::Success
        );
    }

    #[test]
    fn runner_failure_becomes_runtime_error() {
        struct Unlaunchable;

        impl ProcessRunner for Unlaunchable {
            fn run(
                &self,
                command: &str,
                _stdin: &[u8],
                timeout: Option<Duration>,
            ) -> Result<ProcessOutput, RunnerError> {
                Err(RunnerError::TimedOut {
                    command: command.to_string(),
                    timeout: timeout.unwrap_or_default(),
                })
            }
        }

        let config = RunConfig::default().with_timeout(Duration::from_secs(2));
        let outcome = run_case(&Unlaunchable, "spim prog", &case(&[], &[(1, 0)]), &config);
        assert_eq!(
            outcome,
            CaseOutcome::RuntimeError("`spim prog` timed out after 2.000s".to_string())
        );
    }

    #[test]
    fn suite_results_follow_descriptor_order() {
        let runtime = FakeRuntime::new(|input: &str| {
            let delay: u64 = input.trim().parse().unwrap_or(0);
            thread::sleep(Duration::from_millis(delay));
            format!("0x{delay:08x}")
        });
        let suite = suite(vec![
            ("slow", case(&["60"], &[(1, 60)])),
            ("wrong", case(&["30"], &[(1, 31)])),
            ("fast", case(&["0"], &[(1, 0)])),
        ]);

        let run = run_suite(&suite, Path::new("prog"), &runtime, &RunConfig::default());

        let names: Vec<_> = run.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["slow", "wrong", "fast"]);
        assert!(run.results[0].outcome.is_success());
        assert!(matches!(run.results[1].outcome, CaseOutcome::Failure(_)));
        assert!(run.results[2].outcome.is_success());
        assert!(!run.all_passed());

        let seen = runtime.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|(command, _)| command == "fake.mips prog"));
    }

    #[test]
    fn panicking_case_does_not_abort_others() {
        let runtime = FakeRuntime::new(|input: &str| {
            assert!(input != "boom", "runtime exploded");
            adder(input)
        });
        let suite = suite(vec![
            ("ok", case(&["1", "1"], &[(1, 2)])),
            ("boom", case(&["boom"], &[(1, 0)])),
        ]);

        let run = run_suite(&suite, Path::new("prog"), &runtime, &RunConfig::default());

        assert!(run.results[0].outcome.is_success());
        assert_eq!(
            run.results[1].outcome,
            CaseOutcome::RuntimeError("test case panicked".to_string())
        );
    }

    #[test]
    fn summary_counts_each_classification() {
        let run = SuiteRun {
            results: vec![
                CaseResult {
                    name: "a".to_string(),
                    outcome: CaseOutcome::Success,
                },
                CaseResult {
                    name: "b".to_string(),
                    outcome: CaseOutcome::Failure(vec![Mismatch {
                        register: index(1),
                        expected: 1,
                        actual: Some(2),
                    }]),
                },
                CaseResult {
                    name: "c".to_string(),
                    outcome: CaseOutcome::RuntimeError("boom".to_string()),
                },
                CaseResult {
                    name: "d".to_string(),
                    outcome: CaseOutcome::Success,
                },
            ],
        };

        let summary = run.summary();
        assert_eq!(
            summary,
            RunSummary {
                passed: 2,
                failed: 1,
                errored: 1,
                total: 4,
            }
        );
        assert_eq!(summary.to_string(), "2 passed, 1 failed, 1 errored");
    }

    #[test]
    fn invocation_command_appends_executable() {
        assert_eq!(
            invocation_command("java -jar Mars.jar", Path::new("build/prog")),
            "java -jar Mars.jar build/prog"
        );
    }
}
