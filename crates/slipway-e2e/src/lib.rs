//! End-to-end test support for the slipway workspace.
//!
//! The integration tests under `tests/` spawn the workspace's real backend
//! binaries and drive them through the host orchestrator or through the
//! `slipway` binary itself. This crate holds the small pieces those tests
//! share: converting paths to UTF-8 and talking to a running echo backend
//! over TCP.
//!
//! The tests assume the workspace binaries have been built, which a
//! workspace-wide test run guarantees.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::path::Path;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Failures in the shared test support.
#[derive(Debug, Error)]
pub enum SupportError {
    /// A filesystem path was not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },
    /// A binary path had no parent directory.
    #[error("binary path has no parent directory: {path}")]
    NoParentDir {
        /// Path that lacked a parent.
        path: String,
    },
}

/// Converts a standard path into a UTF-8 path.
///
/// # Errors
///
/// Returns [`SupportError::NonUtf8Path`] when the path is not UTF-8.
pub fn utf8_path(path: &Path) -> Result<Utf8PathBuf, SupportError> {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).map_err(|other| SupportError::NonUtf8Path {
        path: other.display().to_string(),
    })
}

/// Directory containing a built workspace binary, as a UTF-8 path. Tests use
/// it as the resource root implementations are resolved from.
///
/// # Errors
///
/// Returns a [`SupportError`] when the path has no parent or is not UTF-8.
pub fn binary_dir(binary: &Path) -> Result<Utf8PathBuf, SupportError> {
    let parent = binary.parent().ok_or_else(|| SupportError::NoParentDir {
        path: binary.display().to_string(),
    })?;
    utf8_path(parent)
}

/// Sends `payload` to an echo service on `port` and returns what comes back.
///
/// The write side is shut down after sending, so the service sees end of
/// input and closes the connection once everything has been echoed.
///
/// # Errors
///
/// Returns the underlying I/O error when the connection fails.
pub fn echo_round_trip(port: u16, payload: &[u8]) -> io::Result<Vec<u8>> {
    let mut stream = TcpStream::connect(("127.0.0.1", port))?;
    stream.write_all(payload)?;
    stream.shutdown(Shutdown::Write)?;
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply)?;
    Ok(reply)
}
