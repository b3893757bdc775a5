//! Provider lifecycle: bounded waits and the start/stop orchestration.

mod error;
mod orchestrator;
mod poll;

pub use error::LifecycleError;
pub use orchestrator::{Orchestrator, StartPlan, StartReport, StopReport};
pub use poll::{
    DEFAULT_POLL_INTERVAL, DEFAULT_READY_TIMEOUT, DEFAULT_SHUTDOWN_TIMEOUT, PollFailure,
    PollOutcome, PollPolicy, wait_until,
};
