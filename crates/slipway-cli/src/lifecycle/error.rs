//! Failures that end a lifecycle goal.

use std::io;
use std::sync::Arc;

use slipway_api::ConfigError;
use slipway_api::contract::ProviderError;
use slipway_isolate::{IsolateError, ResourceSpecError};
use thiserror::Error;

use crate::adapter::AdapterError;

/// Terminal failures of the start/stop orchestration.
///
/// Goals do not recover from any of these; they surface on stderr and fail
/// the invocation.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Configuration did not resolve.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A resource directive did not parse.
    #[error(transparent)]
    Resource(#[from] ResourceSpecError),
    /// The isolation layer could not produce a provider process.
    #[error(transparent)]
    Isolate(#[from] IsolateError),
    /// The boundary adapter could not be established.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    /// A forwarded provider operation failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The provider did not report ready within its budget.
    #[error("provider `{id}` was not ready after {timeout_secs} s")]
    ReadinessTimeout {
        /// Registry id of the provider that stayed unready.
        id: String,
        /// Budget that elapsed, in whole seconds.
        timeout_secs: u64,
    },
    /// The provider did not stop within its budget.
    #[error("provider `{id}` did not stop within {timeout_secs} s")]
    ShutdownTimeout {
        /// Registry id of the provider that kept running.
        id: String,
        /// Budget that elapsed, in whole seconds.
        timeout_secs: u64,
    },
    /// A termination signal arrived during a bounded wait.
    #[error("interrupted while waiting for provider `{id}`")]
    Interrupted {
        /// Registry id of the provider being waited on.
        id: String,
    },
    /// The command run under `exec` could not be started.
    #[error("command `{command}` could not be started")]
    CommandSpawn {
        /// Program name that failed to start.
        command: String,
        /// Underlying spawn failure.
        #[source]
        source: Arc<io::Error>,
    },
    /// Goal output could not be written.
    #[error("goal output could not be written")]
    Output(#[from] io::Error),
}
