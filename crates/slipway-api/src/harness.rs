//! Provider-side serve loop for the control channel.
//!
//! A backend binary builds its [`ServiceProvider`], hands it to a
//! [`ProviderHarness`] and lets the harness speak the protocol on standard
//! I/O. The harness answers one request per line and defers the reply to a
//! blocking launch until the service has exited, which is what makes the
//! foreground-run semantics observable to the host.
//!
//! When the channel reaches end of file the harness stops the service and
//! returns: a provider whose host has gone away must not linger.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use thiserror::Error;
use tracing::{debug, warn};

use crate::channel::{ChannelError, JsonlChannel};
use crate::contract::{ProviderError, ServiceProvider};
use crate::protocol::{CONTRACT_OPERATIONS, ControlRequest, ControlResponse, PROTOCOL_VERSION};

const HARNESS_TARGET: &str = "slipway::harness";

/// Failures that end a harness run.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The control channel failed mid-conversation.
    #[error("control channel failed")]
    Channel(#[from] ChannelError),
}

/// Serve loop binding a provider to the control protocol.
#[derive(Debug)]
pub struct ProviderHarness<P> {
    name: String,
    provider: P,
}

impl<P: ServiceProvider> ProviderHarness<P> {
    /// Wraps `provider` under the given backend name.
    pub fn new(name: impl Into<String>, provider: P) -> Self {
        Self {
            name: name.into(),
            provider,
        }
    }

    /// Serves the protocol until the peer closes the channel.
    ///
    /// # Errors
    ///
    /// Returns a [`HarnessError`] when the channel fails for any reason
    /// other than an orderly close.
    pub fn run<R: BufRead, W: Write>(&self, reader: R, writer: W) -> Result<(), HarnessError> {
        let mut channel = JsonlChannel::new(reader, writer);
        loop {
            let request = match channel.read_frame::<ControlRequest>() {
                Ok(request) => request,
                Err(ChannelError::Closed) => {
                    debug!(target: HARNESS_TARGET, provider = %self.name, "channel closed; winding down");
                    self.stop_after_disconnect();
                    return Ok(());
                }
                Err(error) => return Err(HarnessError::Channel(error)),
            };
            debug!(target: HARNESS_TARGET, provider = %self.name, operation = request.operation(), "serving request");
            let response = self.dispatch(&request);
            channel.write_frame(&response)?;
        }
    }

    fn dispatch(&self, request: &ControlRequest) -> ControlResponse {
        match *request {
            ControlRequest::Describe => ControlResponse::Contract {
                version: PROTOCOL_VERSION,
                provider: self.name.clone(),
                operations: CONTRACT_OPERATIONS
                    .iter()
                    .map(|operation| (*operation).to_owned())
                    .collect(),
            },
            ControlRequest::Launch { block } => {
                reply_for("launch", self.provider.launch(block), ControlResponse::Launched)
            }
            ControlRequest::Stop => {
                reply_for("stop", self.provider.stop(), ControlResponse::Stopped)
            }
            ControlRequest::IsRunning => ControlResponse::Running {
                value: self.provider.is_running(),
            },
            ControlRequest::Port => ControlResponse::Port {
                value: self.provider.port(),
            },
            ControlRequest::BaseUrl => ControlResponse::BaseUrl {
                value: self.provider.base_url(),
            },
        }
    }

    fn stop_after_disconnect(&self) {
        if !self.provider.is_running() {
            return;
        }
        if let Err(error) = self.provider.stop() {
            warn!(target: HARNESS_TARGET, provider = %self.name, %error, "stop after disconnect failed");
        }
    }
}

/// Registers `SIGTERM` and `SIGINT` to raise `flag`, so a serve loop
/// watching the flag winds down when a foreground run is interrupted.
///
/// # Errors
///
/// Returns the underlying error when a handler cannot be registered.
pub fn register_termination(flag: &Arc<AtomicBool>) -> io::Result<()> {
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(flag))?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(flag))?;
    Ok(())
}

fn reply_for(
    operation: &str,
    result: Result<(), ProviderError>,
    success: ControlResponse,
) -> ControlResponse {
    match result {
        Ok(()) => success,
        Err(error) => ControlResponse::Failure {
            operation: operation.to_owned(),
            message: error.to_string(),
        },
    }
}
