//! Bounded condition polling.
//!
//! Readiness and shutdown waits share one loop shape: sleep a fixed
//! interval, evaluate the condition, stop at the deadline. The outcome is
//! a first-class value rather than a boolean so callers can tell "became
//! ready", "ran out of budget" and "aborted" apart without guessing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Pause between condition checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Budget for a provider to become ready.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Budget for a provider to stop.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval and budget of one bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    interval: Duration,
    timeout: Duration,
}

impl PollPolicy {
    /// Builds a policy from an explicit interval and budget.
    #[must_use]
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Default readiness policy: one-second checks, thirty-second budget.
    #[must_use]
    pub const fn ready_default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_READY_TIMEOUT)
    }

    /// Default shutdown policy: one-second checks, ten-second budget.
    #[must_use]
    pub const fn shutdown_default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_SHUTDOWN_TIMEOUT)
    }

    /// Same interval, different budget.
    #[must_use]
    pub const fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            interval: self.interval,
            timeout,
        }
    }

    /// Pause between checks.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Total budget for the wait.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Why a bounded wait ended without its condition turning true.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollFailure {
    /// A termination signal arrived mid-wait.
    Interrupted,
}

/// Outcome of one bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The condition turned true within budget.
    Ready,
    /// The budget elapsed with the condition still false.
    TimedOut,
    /// The wait aborted before an answer was available.
    Failed(PollFailure),
}

/// Evaluates `condition` at fixed intervals until it turns true, the
/// deadline passes, or `interrupt` is raised.
///
/// Checks happen at interval boundaries, so a wait with interval `i` and
/// budget `t` performs at most `t / i` checks. The interrupt flag is
/// consulted before every sleep and every check; a raised flag aborts the
/// wait immediately instead of letting it run out the budget.
pub fn wait_until(
    policy: PollPolicy,
    interrupt: &AtomicBool,
    mut condition: impl FnMut() -> bool,
) -> PollOutcome {
    let deadline = Instant::now() + policy.timeout();
    while Instant::now() < deadline {
        if interrupt.load(Ordering::SeqCst) {
            return PollOutcome::Failed(PollFailure::Interrupted);
        }
        thread::sleep(policy.interval());
        if interrupt.load(Ordering::SeqCst) {
            return PollOutcome::Failed(PollFailure::Interrupted);
        }
        if condition() {
            return PollOutcome::Ready;
        }
    }
    PollOutcome::TimedOut
}
