//! Loopback echo service.
//!
//! Accepts TCP connections on the configured port and writes every received
//! byte straight back to the peer. Exists so provider plumbing can be
//! exercised end to end without a real application server.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use slipway_api::config::ProviderSettings;
use slipway_api::contract::{ProviderError, ServiceProvider};
use slipway_api::net;
use tracing::{debug, info, warn};

const ECHO_TARGET: &str = "slipway::echo";

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
/// Connection reads wake at this cadence so handler threads observe shutdown.
const READ_TIMEOUT: Duration = Duration::from_millis(250);

/// TCP echo service implementing the provider contract.
pub struct EchoService {
    settings: ProviderSettings,
    shutdown: Arc<AtomicBool>,
    state: Mutex<ServeState>,
}

#[derive(Default)]
struct ServeState {
    port: Option<u16>,
    worker: Option<JoinHandle<()>>,
}

impl EchoService {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            shutdown: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(ServeState::default()),
        }
    }

    /// Flag observed by the accept loop. Wire it to termination signals so a
    /// foreground launch can be interrupted.
    pub fn shutdown_flag(&self) -> &Arc<AtomicBool> {
        &self.shutdown
    }

    fn lock_state(&self) -> MutexGuard<'_, ServeState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn bind(&self) -> Result<TcpListener, ProviderError> {
        let port = if self.settings.find_port() {
            net::find_free_port(self.settings.port()).map_err(|error| ProviderError::Failed {
                operation: "launch".to_owned(),
                message: error.to_string(),
            })?
        } else {
            self.settings.port()
        };
        let listener = TcpListener::bind(("127.0.0.1", port)).map_err(ProviderError::io)?;
        listener.set_nonblocking(true).map_err(ProviderError::io)?;
        Ok(listener)
    }
}

impl ServiceProvider for EchoService {
    fn launch(&self, block: bool) -> Result<(), ProviderError> {
        let mut state = self.lock_state();
        if state.port.is_some() {
            return Err(ProviderError::AlreadyLaunched);
        }
        let listener = self.bind()?;
        let port = listener.local_addr().map_err(ProviderError::io)?.port();
        self.shutdown.store(false, Ordering::SeqCst);
        state.port = Some(port);
        info!(target: ECHO_TARGET, port, blocking = block, "echo service listening");
        if block {
            drop(state);
            run_accept_loop(&listener, &self.shutdown);
            self.lock_state().port = None;
            info!(target: ECHO_TARGET, port, "echo service stopped");
        } else {
            let shutdown = Arc::clone(&self.shutdown);
            state.worker = Some(thread::spawn(move || run_accept_loop(&listener, &shutdown)));
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), ProviderError> {
        self.shutdown.store(true, Ordering::SeqCst);
        let worker = {
            let mut state = self.lock_state();
            state.port = None;
            state.worker.take()
        };
        match worker {
            Some(worker) => worker.join().map_err(|_| ProviderError::Failed {
                operation: "stop".to_owned(),
                message: "echo accept loop panicked".to_owned(),
            }),
            None => Ok(()),
        }
    }

    fn is_running(&self) -> bool {
        self.lock_state().port.is_some()
    }

    fn port(&self) -> Option<u16> {
        self.lock_state().port
    }

    fn base_url(&self) -> Option<String> {
        self.port().map(|port| format!("tcp://localhost:{port}"))
    }
}

impl Drop for EchoService {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(listener: &TcpListener, shutdown: &Arc<AtomicBool>) {
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(listener) {
            Ok(Some(stream)) => {
                last_error = None;
                let shutdown = Arc::clone(shutdown);
                thread::spawn(move || {
                    if let Err(error) = echo_connection(stream, &shutdown) {
                        debug!(target: ECHO_TARGET, error = %error, "echo connection ended");
                    }
                });
            }
            Ok(None) => thread::sleep(ACCEPT_BACKOFF),
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(target: ECHO_TARGET, error = %error, "echo accept error");
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
}

fn accept_connection(listener: &TcpListener) -> io::Result<Option<TcpStream>> {
    match listener.accept() {
        Ok((stream, _)) => {
            stream.set_nonblocking(false)?;
            stream.set_read_timeout(Some(READ_TIMEOUT))?;
            Ok(Some(stream))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn echo_connection(mut stream: TcpStream, shutdown: &AtomicBool) -> io::Result<()> {
    let mut buffer = [0_u8; 1024];
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return Ok(());
        }
        match stream.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(read) => stream.write_all(&buffer[..read])?,
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) => {}
            Err(error) => return Err(error),
        }
    }
}
