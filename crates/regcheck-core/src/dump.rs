//! Register-state scraping from the runtime's diagnostic output.
//!
//! The runtime reports registers on standard error as free-form text. The
//! only contract is the token shape: `0x` followed by eight lowercase hex
//! digits, one token per register, in a fixed order. A runtime failure is
//! signalled by the line `MIPS emulator internal error.` followed by a
//! message line.

use std::sync::OnceLock;

use regex::Regex;

use crate::suite::RegisterIndex;

/// Header line the emulator prints before an internal error message.
pub const INTERNAL_ERROR_HEADER: &str = "MIPS emulator internal error.";

/// Register values in the order the runtime printed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterDump {
    values: Vec<u32>,
}

impl RegisterDump {
    /// Wraps an ordered list of register values.
    #[must_use]
    pub const fn new(values: Vec<u32>) -> Self {
        Self { values }
    }

    /// Value of the register at a 1-based index, if the dump reached it.
    #[must_use]
    pub fn get(&self, index: RegisterIndex) -> Option<u32> {
        self.values.get(index.position()).copied()
    }

    /// Number of registers in the dump.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no register tokens were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All values in dump order.
    #[must_use]
    pub fn values(&self) -> &[u32] {
        &self.values
    }
}

fn register_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"0x[0-9a-f]{8}").expect("register token pattern is valid"))
}

fn internal_error() -> &'static Regex {
    static SIGNATURE: OnceLock<Regex> = OnceLock::new();
    SIGNATURE.get_or_init(|| {
        Regex::new(r"MIPS emulator internal error\.\n[^\r\n]*")
            .expect("internal error pattern is valid")
    })
}

/// Extracts every register token from `text`, in order of appearance.
///
/// Longer hex runs contribute their first eight digits, and uppercase
/// digits are not part of the token shape.
#[must_use]
pub fn parse_register_dump(text: &str) -> RegisterDump {
    let values = register_token()
        .find_iter(text)
        .filter_map(|m| u32::from_str_radix(&m.as_str()[2..], 16).ok())
        .collect();
    RegisterDump::new(values)
}

/// Returns the first internal-error header plus its message line, if any.
#[must_use]
pub fn find_internal_error(text: &str) -> Option<&str> {
    internal_error().find(text).map(|m| m.as_str())
}
