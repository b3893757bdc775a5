//! Process-backed implementation of the provider contract.

use std::fmt;
use std::io::{BufReader, BufWriter};
use std::process::{Child, ChildStdin, ChildStdout};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use slipway_api::channel::{ChannelError, ControlChannel, JsonlChannel};
use slipway_api::contract::{ProviderError, ServiceProvider};
use slipway_api::protocol::{
    CONTRACT_OPERATIONS, ControlRequest, ControlResponse, PROTOCOL_VERSION,
};
use tracing::{debug, warn};

use super::error::AdapterError;

const ADAPTER_TARGET: &str = "slipway::adapter";

/// Pause between closing the control channel and killing a child that has
/// not exited on its own.
const TERMINATE_GRACE: Duration = Duration::from_millis(200);

/// Control channel wired to a real child process.
pub type ChildChannel = JsonlChannel<BufReader<ChildStdout>, BufWriter<ChildStdin>>;

/// Forwarding stand-in for a provider running in an isolated process.
///
/// Each [`ServiceProvider`] operation becomes one request frame on the
/// control channel. Launch and stop failures reported by the remote side
/// surface as [`ProviderError::Failed`] with the message unchanged; the
/// observer operations degrade to "not running" when the channel is gone,
/// so a crashed child reads as a stopped service rather than an error.
pub struct ProcessProvider<C = ChildChannel> {
    implementation: String,
    link: Mutex<Link<C>>,
}

struct Link<C> {
    channel: Option<C>,
    child: Option<Child>,
}

impl<C: ControlChannel> ProcessProvider<C> {
    /// Verifies the contract over `channel` and wraps it.
    ///
    /// Used directly by tests; production code goes through
    /// [`ProcessProvider::connect`], which also takes ownership of the
    /// child process.
    ///
    /// # Errors
    ///
    /// Returns an [`AdapterError`] when the describe handshake fails or the
    /// announced contract does not cover every required operation.
    pub fn over_channel(
        implementation: impl Into<String>,
        mut channel: C,
    ) -> Result<Self, AdapterError> {
        let implementation = implementation.into();
        handshake(&mut channel, &implementation)?;
        Ok(Self {
            implementation,
            link: Mutex::new(Link {
                channel: Some(channel),
                child: None,
            }),
        })
    }

    /// Implementation name this stand-in forwards to.
    #[must_use]
    pub fn implementation(&self) -> &str {
        &self.implementation
    }

    fn exchange(&self, request: &ControlRequest) -> Result<ControlResponse, ProviderError> {
        let operation = request.operation();
        let mut link = self
            .link
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let Some(channel) = link.channel.as_mut() else {
            return Err(ProviderError::Channel {
                operation: operation.to_owned(),
                source: ChannelError::Closed,
            });
        };
        channel.send(request).map_err(|source| ProviderError::Channel {
            operation: operation.to_owned(),
            source,
        })?;
        match channel.recv() {
            Ok(ControlResponse::Failure { operation, message }) => {
                Err(ProviderError::Failed { operation, message })
            }
            Ok(reply) => Ok(reply),
            Err(source) => Err(ProviderError::Channel {
                operation: operation.to_owned(),
                source,
            }),
        }
    }

    /// Observer queries fall back to `absent` when the channel is gone so
    /// a crashed child reads as a stopped service.
    fn observe<T>(
        &self,
        request: &ControlRequest,
        absent: T,
        decode: impl FnOnce(ControlResponse) -> Option<T>,
    ) -> T {
        let operation = request.operation();
        match self.exchange(request) {
            Ok(reply) => decode(reply).unwrap_or_else(|| {
                warn!(
                    target: ADAPTER_TARGET,
                    implementation = %self.implementation,
                    operation,
                    "unexpected reply to observer query"
                );
                absent
            }),
            Err(error) => {
                debug!(
                    target: ADAPTER_TARGET,
                    implementation = %self.implementation,
                    operation,
                    %error,
                    "treating unreachable provider as not running"
                );
                absent
            }
        }
    }
}

impl ProcessProvider<ChildChannel> {
    /// Takes ownership of a freshly spawned implementation process and
    /// performs the describe handshake over its stdio.
    ///
    /// The child is terminated when the handshake fails and whenever the
    /// stand-in is dropped.
    ///
    /// # Errors
    ///
    /// Returns an [`AdapterError`] when the child exposes no stdio pipes,
    /// the handshake fails, or the announced contract is incomplete.
    pub fn connect(
        mut child: Child,
        implementation: impl Into<String>,
    ) -> Result<Self, AdapterError> {
        let implementation = implementation.into();
        let Some(stdin) = child.stdin.take() else {
            terminate(&mut child, &implementation);
            return Err(AdapterError::NoChannel { implementation });
        };
        let Some(stdout) = child.stdout.take() else {
            terminate(&mut child, &implementation);
            return Err(AdapterError::NoChannel { implementation });
        };
        let mut channel = JsonlChannel::new(BufReader::new(stdout), BufWriter::new(stdin));
        if let Err(error) = handshake(&mut channel, &implementation) {
            drop(channel);
            terminate(&mut child, &implementation);
            return Err(error);
        }
        Ok(Self {
            implementation,
            link: Mutex::new(Link {
                channel: Some(channel),
                child: Some(child),
            }),
        })
    }
}

impl<C: ControlChannel> ServiceProvider for ProcessProvider<C> {
    fn launch(&self, block: bool) -> Result<(), ProviderError> {
        match self.exchange(&ControlRequest::Launch { block })? {
            ControlResponse::Launched => Ok(()),
            other => Err(unexpected("launch", &other)),
        }
    }

    fn stop(&self) -> Result<(), ProviderError> {
        match self.exchange(&ControlRequest::Stop)? {
            ControlResponse::Stopped => Ok(()),
            other => Err(unexpected("stop", &other)),
        }
    }

    fn is_running(&self) -> bool {
        self.observe(&ControlRequest::IsRunning, false, |reply| match reply {
            ControlResponse::Running { value } => Some(value),
            _ => None,
        })
    }

    fn port(&self) -> Option<u16> {
        self.observe(&ControlRequest::Port, None, |reply| match reply {
            ControlResponse::Port { value } => Some(value),
            _ => None,
        })
    }

    fn base_url(&self) -> Option<String> {
        self.observe(&ControlRequest::BaseUrl, None, |reply| match reply {
            ControlResponse::BaseUrl { value } => Some(value),
            _ => None,
        })
    }
}

impl<C> Drop for ProcessProvider<C> {
    fn drop(&mut self) {
        let mut link = self
            .link
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        // Closing the channel first signals EOF, which lets the harness on
        // the other side stop its service and exit on its own.
        drop(link.channel.take());
        if let Some(mut child) = link.child.take() {
            terminate(&mut child, &self.implementation);
        }
    }
}

impl<C> fmt::Debug for ProcessProvider<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessProvider")
            .field("implementation", &self.implementation)
            .finish_non_exhaustive()
    }
}

fn unexpected(operation: &str, reply: &ControlResponse) -> ProviderError {
    ProviderError::UnexpectedReply {
        operation: operation.to_owned(),
        detail: format!("{reply:?}"),
    }
}

/// Verifies that the remote side announces a full provider contract.
fn handshake<C: ControlChannel>(channel: &mut C, implementation: &str) -> Result<(), AdapterError> {
    channel
        .send(&ControlRequest::Describe)
        .map_err(|source| AdapterError::Handshake {
            implementation: implementation.to_owned(),
            source,
        })?;
    match channel.recv() {
        Ok(ControlResponse::Contract {
            version,
            provider,
            operations,
        }) => {
            if version != PROTOCOL_VERSION {
                return Err(AdapterError::VersionMismatch {
                    implementation: implementation.to_owned(),
                    remote: version,
                    host: PROTOCOL_VERSION,
                });
            }
            let missing: Vec<String> = CONTRACT_OPERATIONS
                .iter()
                .copied()
                .filter(|required| !operations.iter().any(|offered| offered == required))
                .map(str::to_owned)
                .collect();
            if !missing.is_empty() {
                return Err(AdapterError::ContractMismatch {
                    implementation: implementation.to_owned(),
                    missing,
                });
            }
            debug!(
                target: ADAPTER_TARGET,
                implementation,
                provider = %provider,
                "contract verified"
            );
            Ok(())
        }
        Ok(other) => Err(AdapterError::HandshakeReply {
            implementation: implementation.to_owned(),
            detail: format!("{other:?}"),
        }),
        Err(source) => Err(AdapterError::Handshake {
            implementation: implementation.to_owned(),
            source,
        }),
    }
}

/// Best-effort teardown of a child process: give it a moment to exit after
/// the channel closed, then kill and reap it.
fn terminate(child: &mut Child, implementation: &str) {
    match child.try_wait() {
        Ok(Some(_)) => return,
        Ok(None) => thread::sleep(TERMINATE_GRACE),
        Err(error) => {
            warn!(
                target: ADAPTER_TARGET,
                implementation,
                %error,
                "could not query child state"
            );
            return;
        }
    }
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    if let Err(error) = child.kill() {
        debug!(
            target: ADAPTER_TARGET,
            implementation,
            %error,
            "kill after grace period failed"
        );
    }
    if let Err(error) = child.wait() {
        warn!(
            target: ADAPTER_TARGET,
            implementation,
            %error,
            "could not reap child"
        );
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::{eq, ne};
    use mockall::{Sequence, mock};

    use super::*;

    mock! {
        Channel {}

        impl ControlChannel for Channel {
            fn send(&mut self, request: &ControlRequest) -> Result<(), ChannelError>;
            fn recv(&mut self) -> Result<ControlResponse, ChannelError>;
        }
    }

    fn contract_frame() -> ControlResponse {
        ControlResponse::Contract {
            version: PROTOCOL_VERSION,
            provider: "double".to_owned(),
            operations: CONTRACT_OPERATIONS.iter().map(|op| (*op).to_owned()).collect(),
        }
    }

    fn expect_handshake(channel: &mut MockChannel, seq: &mut Sequence) {
        channel
            .expect_send()
            .with(eq(ControlRequest::Describe))
            .times(1)
            .in_sequence(seq)
            .returning(|_| Ok(()));
        channel
            .expect_recv()
            .times(1)
            .in_sequence(seq)
            .returning(|| Ok(contract_frame()));
    }

    fn expect_exchange(
        channel: &mut MockChannel,
        seq: &mut Sequence,
        request: ControlRequest,
        reply: ControlResponse,
    ) {
        channel
            .expect_send()
            .with(eq(request))
            .times(1)
            .in_sequence(seq)
            .returning(|_| Ok(()));
        channel
            .expect_recv()
            .times(1)
            .in_sequence(seq)
            .returning(move || Ok(reply.clone()));
    }

    #[test]
    fn handshake_accepts_a_conforming_contract() {
        let mut seq = Sequence::new();
        let mut channel = MockChannel::new();
        expect_handshake(&mut channel, &mut seq);

        let provider =
            ProcessProvider::over_channel("double", channel).expect("handshake should pass");
        assert_eq!(provider.implementation(), "double");
    }

    #[test]
    fn handshake_flags_missing_operations_immediately() {
        let mut seq = Sequence::new();
        let mut channel = MockChannel::new();
        channel
            .expect_send()
            .with(eq(ControlRequest::Describe))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        channel
            .expect_recv()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| {
                Ok(ControlResponse::Contract {
                    version: PROTOCOL_VERSION,
                    provider: "partial".to_owned(),
                    operations: vec![
                        "launch".to_owned(),
                        "is_running".to_owned(),
                        "port".to_owned(),
                    ],
                })
            });

        let error = ProcessProvider::over_channel("partial", channel)
            .err()
            .expect("handshake should fail");
        match error {
            AdapterError::ContractMismatch { missing, .. } => {
                assert_eq!(missing, ["stop", "base_url"]);
            }
            other => panic!("expected a contract mismatch, got {other:?}"),
        }
    }

    #[test]
    fn handshake_rejects_protocol_skew() {
        let mut seq = Sequence::new();
        let mut channel = MockChannel::new();
        channel
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        channel
            .expect_recv()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| {
                Ok(ControlResponse::Contract {
                    version: PROTOCOL_VERSION + 1,
                    provider: "future".to_owned(),
                    operations: CONTRACT_OPERATIONS
                        .iter()
                        .map(|op| (*op).to_owned())
                        .collect(),
                })
            });

        let error = ProcessProvider::over_channel("future", channel)
            .err()
            .expect("handshake should fail");
        assert!(matches!(
            error,
            AdapterError::VersionMismatch { remote, host, .. }
                if remote == PROTOCOL_VERSION + 1 && host == PROTOCOL_VERSION
        ));
    }

    #[test]
    fn handshake_rejects_a_non_contract_reply() {
        let mut seq = Sequence::new();
        let mut channel = MockChannel::new();
        channel
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        channel
            .expect_recv()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(ControlResponse::Launched));

        let error = ProcessProvider::over_channel("odd", channel)
            .err()
            .expect("handshake should fail");
        assert!(matches!(error, AdapterError::HandshakeReply { .. }));
    }

    #[test]
    fn operations_forward_and_decode_remote_answers() {
        let mut seq = Sequence::new();
        let mut channel = MockChannel::new();
        expect_handshake(&mut channel, &mut seq);
        expect_exchange(
            &mut channel,
            &mut seq,
            ControlRequest::Launch { block: false },
            ControlResponse::Launched,
        );
        expect_exchange(
            &mut channel,
            &mut seq,
            ControlRequest::IsRunning,
            ControlResponse::Running { value: true },
        );
        expect_exchange(
            &mut channel,
            &mut seq,
            ControlRequest::Port,
            ControlResponse::Port { value: Some(8080) },
        );
        expect_exchange(
            &mut channel,
            &mut seq,
            ControlRequest::BaseUrl,
            ControlResponse::BaseUrl {
                value: Some("http://localhost:8080/".to_owned()),
            },
        );
        expect_exchange(
            &mut channel,
            &mut seq,
            ControlRequest::Stop,
            ControlResponse::Stopped,
        );

        let provider =
            ProcessProvider::over_channel("double", channel).expect("handshake should pass");
        provider.launch(false).expect("launch should forward");
        assert!(provider.is_running());
        assert_eq!(provider.port(), Some(8080));
        assert_eq!(
            provider.base_url().as_deref(),
            Some("http://localhost:8080/")
        );
        provider.stop().expect("stop should forward");
    }

    #[test]
    fn remote_failure_propagates_with_its_message() {
        let mut seq = Sequence::new();
        let mut channel = MockChannel::new();
        expect_handshake(&mut channel, &mut seq);
        expect_exchange(
            &mut channel,
            &mut seq,
            ControlRequest::Stop,
            ControlResponse::Failure {
                operation: "stop".to_owned(),
                message: "listener already gone".to_owned(),
            },
        );

        let provider =
            ProcessProvider::over_channel("double", channel).expect("handshake should pass");
        let error = provider.stop().err().expect("stop should fail");
        match error {
            ProviderError::Failed { operation, message } => {
                assert_eq!(operation, "stop");
                assert_eq!(message, "listener already gone");
            }
            other => panic!("expected the remote failure, got {other:?}"),
        }
    }

    #[test]
    fn a_dead_channel_reads_as_not_running() {
        let mut seq = Sequence::new();
        let mut channel = MockChannel::new();
        expect_handshake(&mut channel, &mut seq);
        channel
            .expect_send()
            .with(ne(ControlRequest::Describe))
            .times(3)
            .returning(|_| Err(ChannelError::Closed));

        let provider =
            ProcessProvider::over_channel("double", channel).expect("handshake should pass");
        assert!(!provider.is_running());
        assert_eq!(provider.port(), None);
        assert_eq!(provider.base_url(), None);
    }

    #[test]
    fn launch_rejects_a_mismatched_reply() {
        let mut seq = Sequence::new();
        let mut channel = MockChannel::new();
        expect_handshake(&mut channel, &mut seq);
        expect_exchange(
            &mut channel,
            &mut seq,
            ControlRequest::Launch { block: true },
            ControlResponse::Running { value: true },
        );

        let provider =
            ProcessProvider::over_channel("double", channel).expect("handshake should pass");
        let error = provider.launch(true).err().expect("launch should fail");
        assert!(matches!(error, ProviderError::UnexpectedReply { .. }));
    }
}
