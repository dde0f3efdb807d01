//! Resource bounds for a single interpreter run.
//!
//! Carbon has no timeouts or cancellation — the only termination besides
//! `main` returning or a runtime error is an internal resource limit,
//! guarding against runaway user programs (an infinite `while true {}`, or
//! unbounded recursion) during development and testing.

/// Default ceiling on the number of statements/expressions the
/// interpreter will evaluate before giving up with [`crate::CarbonError`].
pub const DEFAULT_MAX_STEPS: u64 = 10_000_000;

/// Default ceiling on nested function-call depth.
pub const DEFAULT_MAX_CALL_DEPTH: u32 = 4_096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepLimits {
    pub max_steps: u64,
    pub max_call_depth: u32,
}

impl Default for StepLimits {
    fn default() -> Self {
        Self { max_steps: DEFAULT_MAX_STEPS, max_call_depth: DEFAULT_MAX_CALL_DEPTH }
    }
}

impl StepLimits {
    pub fn new(max_steps: u64, max_call_depth: u32) -> Self {
        Self { max_steps, max_call_depth }
    }
}
