//! Static-file service implementing the provider contract.

use std::fs;
use std::io::{self, BufRead, BufReader};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use slipway_api::config::{self, ConfigError, ProviderSettings};
use slipway_api::contract::{ProviderError, ServiceProvider};
use slipway_api::net;
use tracing::{debug, info, warn};

use crate::http;

const STATIC_TARGET: &str = "slipway::static";

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
/// Bounds how long a stalled client can hold a handler thread.
const READ_TIMEOUT: Duration = Duration::from_millis(250);

const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Document root served when `SLIPWAY_STATIC_ROOT` is unset.
pub const DEFAULT_DOC_ROOT: &str = "static";
/// Context path served when `SLIPWAY_STATIC_CONTEXT_PATH` is unset.
pub const DEFAULT_CONTEXT_PATH: &str = "/";

/// What the static backend serves and where.
#[derive(Debug, Clone)]
pub struct StaticSettings {
    doc_root: Utf8PathBuf,
    context_path: String,
}

impl StaticSettings {
    pub fn new(doc_root: Utf8PathBuf, context_path: &str) -> Self {
        Self {
            doc_root,
            context_path: normalise_context_path(context_path),
        }
    }

    /// Resolves the document root and context path from the environment.
    /// The root is taken relative to the working directory and created when
    /// missing, so a fresh checkout serves an empty tree instead of failing.
    pub fn resolve(
        working_dir: &Utf8Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let root = lookup(config::ENV_STATIC_ROOT)
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DOC_ROOT));
        let doc_root = config::resolve_under_working_dir(working_dir, &root)?;
        let context_path = lookup(config::ENV_STATIC_CONTEXT_PATH)
            .unwrap_or_else(|| DEFAULT_CONTEXT_PATH.to_owned());
        Ok(Self::new(doc_root, &context_path))
    }

    pub fn doc_root(&self) -> &Utf8Path {
        &self.doc_root
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }
}

fn normalise_context_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return DEFAULT_CONTEXT_PATH.to_owned();
    }
    if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

/// HTTP file server implementing the provider contract.
pub struct StaticService {
    settings: ProviderSettings,
    content: Arc<StaticSettings>,
    shutdown: Arc<AtomicBool>,
    state: Mutex<ServeState>,
}

#[derive(Default)]
struct ServeState {
    port: Option<u16>,
    worker: Option<JoinHandle<()>>,
}

impl StaticService {
    pub fn new(settings: ProviderSettings, content: StaticSettings) -> Self {
        Self {
            settings,
            content: Arc::new(content),
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

impl ServiceProvider for StaticService {
    fn launch(&self, block: bool) -> Result<(), ProviderError> {
        let mut state = self.lock_state();
        if state.port.is_some() {
            return Err(ProviderError::AlreadyLaunched);
        }
        let listener = self.bind()?;
        let port = listener.local_addr().map_err(ProviderError::io)?.port();
        self.shutdown.store(false, Ordering::SeqCst);
        state.port = Some(port);
        info!(
            target: STATIC_TARGET,
            port,
            doc_root = %self.content.doc_root(),
            context_path = self.content.context_path(),
            blocking = block,
            "static service listening"
        );
        if block {
            drop(state);
            run_accept_loop(&listener, &self.shutdown, &self.content);
            self.lock_state().port = None;
            info!(target: STATIC_TARGET, port, "static service stopped");
        } else {
            let shutdown = Arc::clone(&self.shutdown);
            let content = Arc::clone(&self.content);
            state.worker = Some(thread::spawn(move || {
                run_accept_loop(&listener, &shutdown, &content);
            }));
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
                message: "static accept loop panicked".to_owned(),
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
        self.port()
            .map(|port| format!("http://localhost:{port}{}", self.content.context_path()))
    }
}

impl Drop for StaticService {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(listener: &TcpListener, shutdown: &Arc<AtomicBool>, content: &Arc<StaticSettings>) {
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(listener) {
            Ok(Some(stream)) => {
                last_error = None;
                let content = Arc::clone(content);
                thread::spawn(move || {
                    if let Err(error) = handle_connection(stream, &content) {
                        debug!(target: STATIC_TARGET, error = %error, "connection ended");
                    }
                });
            }
            Ok(None) => thread::sleep(ACCEPT_BACKOFF),
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(target: STATIC_TARGET, error = %error, "accept error");
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

fn handle_connection(stream: TcpStream, content: &StaticSettings) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let writer = stream;
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(());
    }
    let Some(request) = http::parse_request_line(&line) else {
        return http::write_response(writer, 400, "Bad Request", PLAIN_TEXT, b"bad request\n");
    };
    drain_headers(&mut reader)?;
    if request.method != "GET" {
        return http::write_response(
            writer,
            405,
            "Method Not Allowed",
            PLAIN_TEXT,
            b"method not allowed\n",
        );
    }
    match http::resolve_target(content.doc_root(), content.context_path(), &request.target) {
        http::Resolution::File(path) => match fs::read(path.as_std_path()) {
            Ok(body) => {
                debug!(target: STATIC_TARGET, path = %path, "serving file");
                http::write_response(writer, 200, "OK", http::content_type_for(&path), &body)
            }
            Err(_) => http::write_response(writer, 404, "Not Found", PLAIN_TEXT, b"not found\n"),
        },
        http::Resolution::Rejected => {
            http::write_response(writer, 404, "Not Found", PLAIN_TEXT, b"not found\n")
        }
    }
}

fn drain_headers(reader: &mut impl BufRead) -> io::Result<()> {
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 || header.trim_end().is_empty() {
            return Ok(());
        }
    }
}
