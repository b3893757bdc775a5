//! Failures establishing the boundary adapter.

use slipway_api::ChannelError;
use thiserror::Error;

/// Errors raised while verifying or speaking to a spawned implementation.
///
/// Every variant is terminal for the goal that hit it.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The spawned implementation exposes no stdio control channel.
    #[error("implementation `{implementation}` exposes no control channel")]
    NoChannel {
        /// Implementation name as resolved in the isolation context.
        implementation: String,
    },
    /// The remote contract lacks operations the host requires.
    #[error(
        "implementation `{implementation}` does not satisfy the provider \
         contract: missing {missing:?}"
    )]
    ContractMismatch {
        /// Implementation name as resolved in the isolation context.
        implementation: String,
        /// Contract operations the remote side failed to offer.
        missing: Vec<String>,
    },
    /// The remote side speaks a different protocol revision.
    #[error(
        "implementation `{implementation}` speaks protocol version {remote}, \
         this host speaks {host}"
    )]
    VersionMismatch {
        /// Implementation name as resolved in the isolation context.
        implementation: String,
        /// Protocol version announced by the remote side.
        remote: u32,
        /// Protocol version this host implements.
        host: u32,
    },
    /// The describe handshake failed at the channel level.
    #[error("describe handshake with `{implementation}` failed")]
    Handshake {
        /// Implementation name as resolved in the isolation context.
        implementation: String,
        /// Underlying channel failure.
        #[source]
        source: ChannelError,
    },
    /// The describe handshake was answered with a non-contract frame.
    #[error("describe handshake with `{implementation}` got an unexpected reply: {detail}")]
    HandshakeReply {
        /// Implementation name as resolved in the isolation context.
        implementation: String,
        /// Debug rendering of the offending frame.
        detail: String,
    },
}
