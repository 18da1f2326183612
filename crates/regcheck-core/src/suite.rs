//! Test-suite descriptor model and loader.
//!
//! A suite descriptor is a JSON object:
//!
//! ```json
//! {
//!   "preprocessor": "mips-as",
//!   "destination": "build/prog",
//!   "runtime": "mips.twoints",
//!   "tests": {
//!     "adds two numbers": { "input": ["5", "3"], "expected": { "1": 8 } },
//!     "traps on overflow": { "input": [], "expected": {}, "error": true }
//!   }
//! }
//! ```
//!
//! Only `runtime` is mandatory. A missing or empty `tests` object is not an
//! error: the loader reports [`LoadedSuite::NoTests`] and the caller has
//! nothing to do.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{SuiteError, MISSING_RUNTIME_MESSAGE};

/// 1-based position of a register in the runtime's diagnostic dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegisterIndex(NonZeroUsize);

impl RegisterIndex {
    /// Creates an index, rejecting zero.
    #[must_use]
    pub const fn new(index: usize) -> Option<Self> {
        match NonZeroUsize::new(index) {
            Some(index) => Some(Self(index)),
            None => None,
        }
    }

    /// The 1-based index as written in the suite.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0.get()
    }

    /// The 0-based position into the parsed dump.
    #[must_use]
    pub const fn position(self) -> usize {
        self.0.get() - 1
    }
}

impl fmt::Display for RegisterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error parsing a register index key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRegisterIndexError {
    /// The offending key text.
    pub text: String,
}

impl fmt::Display for ParseRegisterIndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid register index \"{}\": expected a positive integer",
            self.text
        )
    }
}

impl std::error::Error for ParseRegisterIndexError {}

impl FromStr for RegisterIndex {
    type Err = ParseRegisterIndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<usize>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| ParseRegisterIndexError {
                text: s.to_string(),
            })
    }
}

/// One named scenario: program input plus expected register values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Lines fed to the program's standard input.
    pub input: Vec<String>,
    /// Expected register values, compared in ascending index order.
    pub expected: BTreeMap<RegisterIndex, i64>,
    /// Whether an internal emulator error is an expected outcome.
    pub expects_error: bool,
}

impl TestCase {
    /// Standard input bytes: input lines joined by newlines, no trailing one.
    #[must_use]
    pub fn stdin(&self) -> Vec<u8> {
        self.input.join("\n").into_bytes()
    }
}

/// A validated test suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSuite {
    /// Command that runs a program inside the emulator.
    pub runtime: String,
    /// Command that turns the program source into an executable.
    pub preprocessor: Option<String>,
    /// Where the preprocessor output is written.
    pub destination: Option<PathBuf>,
    /// Named test cases in descriptor order. Never empty.
    pub tests: Vec<(String, TestCase)>,
}

/// Outcome of loading a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedSuite {
    /// The suite has at least one test case.
    Ready(TestSuite),
    /// The `tests` mapping is absent, not an object, or empty.
    NoTests,
}

#[derive(Deserialize)]
struct RawCase {
    #[serde(default, deserialize_with = "input_lines")]
    input: Vec<String>,
    #[serde(default)]
    expected: BTreeMap<String, i64>,
    #[serde(default)]
    error: bool,
}

/// Input lines may be any JSON scalar: numbers and booleans are written as
/// their JSON text and `null` as an empty line.
fn input_lines<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Value>::deserialize(deserializer)?
        .into_iter()
        .map(|line| match line {
            Value::String(text) => Ok(text),
            Value::Null => Ok(String::new()),
            Value::Bool(_) | Value::Number(_) => Ok(line.to_string()),
            other => Err(de::Error::custom(format!(
                "input line must be a string or scalar, found {other}"
            ))),
        })
        .collect()
}

/// Reads and validates the suite descriptor at `path`.
///
/// # Errors
///
/// Returns [`SuiteError::Parse`] if the file cannot be read or is not JSON,
/// and [`SuiteError::Validation`] if required fields are absent or mistyped.
pub fn load_suite(path: &Path) -> Result<LoadedSuite, SuiteError> {
    let text = fs::read_to_string(path)
        .map_err(|e| SuiteError::Parse(format!("{}: {e}", path.display())))?;

    let loaded = parse_suite(&text)?;
    match &loaded {
        LoadedSuite::Ready(suite) => log::debug!(
            "loaded suite {} with {} test case(s)",
            path.display(),
            suite.tests.len()
        ),
        LoadedSuite::NoTests => log::debug!("suite {} has no test cases", path.display()),
    }
    Ok(loaded)
}

/// Parses and validates suite descriptor text.
///
/// # Errors
///
/// Returns [`SuiteError::Parse`] for malformed JSON and
/// [`SuiteError::Validation`] for missing or mistyped fields.
pub fn parse_suite(text: &str) -> Result<LoadedSuite, SuiteError> {
    let root: Value = serde_json::from_str(text).map_err(|e| SuiteError::Parse(e.to_string()))?;
    let empty = Map::new();
    let root = root.as_object().unwrap_or(&empty);

    let runtime = match root.get("runtime") {
        Some(Value::String(runtime)) if !runtime.is_empty() => runtime.clone(),
        _ => return Err(SuiteError::Validation(MISSING_RUNTIME_MESSAGE.to_string())),
    };

    let tests = match root.get("tests") {
        Some(Value::Object(tests)) if !tests.is_empty() => tests,
        _ => return Ok(LoadedSuite::NoTests),
    };

    let preprocessor =
        optional_string(root, "preprocessor")?.filter(|command| !command.is_empty());
    let destination = optional_string(root, "destination")?.map(PathBuf::from);

    let tests = tests
        .iter()
        .map(|(name, value)| parse_case(name, value).map(|case| (name.clone(), case)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LoadedSuite::Ready(TestSuite {
        runtime,
        preprocessor,
        destination,
        tests,
    }))
}

fn optional_string(root: &Map<String, Value>, key: &str) -> Result<Option<String>, SuiteError> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(SuiteError::Validation(format!(
            "\"{key}\" must be a string, found {other}"
        ))),
    }
}

fn parse_case(name: &str, value: &Value) -> Result<TestCase, SuiteError> {
    let invalid = |message: String| SuiteError::Validation(format!("test case \"{name}\": {message}"));

    let raw = RawCase::deserialize(value).map_err(|e| invalid(e.to_string()))?;

    let expected = raw
        .expected
        .into_iter()
        .map(|(key, value)| {
            key.parse::<RegisterIndex>()
                .map(|index| (index, value))
                .map_err(|e| invalid(e.to_string()))
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    Ok(TestCase {
        input: raw.input,
        expected,
        expects_error: raw.error,
    })
}
