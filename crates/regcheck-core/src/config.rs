//! Run-time knobs for the test executor.

use std::time::Duration;

/// How many register discrepancies a failing case reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MismatchPolicy {
    /// Stop at the first mismatching register, in ascending index order.
    #[default]
    First,
    /// Compare every expected register and report all mismatches.
    All,
}

/// Configuration shared by every test case of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Per-case wall-clock limit. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Mismatch reporting policy.
    pub mismatch_policy: MismatchPolicy,
}

impl RunConfig {
    /// Sets the per-case timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the mismatch reporting policy.
    #[must_use]
    pub const fn with_mismatch_policy(mut self, policy: MismatchPolicy) -> Self {
        self.mismatch_policy = policy;
        self
    }
}
