//! The provider contract every embedded-service backend satisfies.
//!
//! A provider is the one long-lived collaborator in a slipway run: something
//! that can be launched, observed while it serves, and stopped. The host never
//! sees a backend's concrete type. It drives providers exclusively through
//! [`ServiceProvider`], whether the implementation lives in the same process
//! (test doubles) or behind the control channel in an isolated child.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Capability surface of an embedded service.
pub trait ServiceProvider {
    /// Starts the service.
    ///
    /// With `block = false` the call returns once the start has been
    /// accepted; readiness is established separately by polling
    /// [`is_running`](Self::is_running). With `block = true` the service
    /// becomes the foreground activity of the caller and the call does not
    /// return until the service exits.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::AlreadyLaunched`] when the service is already
    /// started, or another [`ProviderError`] when startup fails.
    fn launch(&self, block: bool) -> Result<(), ProviderError>;

    /// Stops the service. Stopping a service that never started is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when shutdown fails.
    fn stop(&self) -> Result<(), ProviderError>;

    /// Reports whether the service is currently accepting work.
    #[must_use]
    fn is_running(&self) -> bool;

    /// The listening port, absent while the service is not running.
    #[must_use]
    fn port(&self) -> Option<u16>;

    /// The base URL in `scheme://host:port/contextPath` form, absent while
    /// the service is not running.
    #[must_use]
    fn base_url(&self) -> Option<String>;
}

/// Failures raised by provider operations on either side of the boundary.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// `launch` was issued while the service was already started.
    #[error("provider was already launched")]
    AlreadyLaunched,
    /// The remote provider reported a failure; the message is carried
    /// through unchanged.
    #[error("provider `{operation}` failed: {message}")]
    Failed {
        /// Contract operation that failed.
        operation: String,
        /// Failure detail exactly as the provider reported it.
        message: String,
    },
    /// The control channel broke down while forwarding an operation.
    #[error("control channel failed during `{operation}`")]
    Channel {
        /// Contract operation in flight when the channel failed.
        operation: String,
        /// Underlying channel failure.
        #[source]
        source: crate::channel::ChannelError,
    },
    /// The remote provider answered with a frame the operation cannot use.
    #[error("unexpected reply to `{operation}`: {detail}")]
    UnexpectedReply {
        /// Contract operation that was being forwarded.
        operation: String,
        /// Description of the offending frame.
        detail: String,
    },
    /// An I/O failure inside the provider itself.
    #[error("provider i/o failed: {source}")]
    Io {
        /// Underlying I/O failure.
        #[source]
        source: Arc<io::Error>,
    },
}

impl ProviderError {
    /// Wraps an I/O failure raised inside a backend.
    #[must_use]
    pub fn io(source: io::Error) -> Self {
        Self::Io {
            source: Arc::new(source),
        }
    }
}
