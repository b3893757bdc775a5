//! Configuration keys and resolution helpers shared across the boundary.
//!
//! The host resolves these settings from flags and its environment, then
//! re-exports them into the scrubbed environment of the provider process it
//! spawns. Backends resolve the same keys from that scrubbed environment, so
//! one module owns the key names, the defaults, and the parsing rules.
//!
//! Every resolver takes the lookup function as an argument instead of
//! reading the process environment directly; tests supply closures over
//! plain maps and never mutate global state.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Implementation name to resolve inside the isolation context.
pub const ENV_IMPLEMENTATION: &str = "SLIPWAY_IMPLEMENTATION";
/// Resolution scope selector (`compile`, `runtime` or `test`).
pub const ENV_SCOPE: &str = "SLIPWAY_SCOPE";
/// Comma-separated resource list consumed when no `--resource` flags are
/// given. Commas avoid clashing with the optional `scope:` prefix.
pub const ENV_RESOURCES: &str = "SLIPWAY_RESOURCES";
/// Working-directory override.
pub const ENV_WORKING_DIR: &str = "SLIPWAY_WORKING_DIR";
/// Default listen port handed to the provider.
pub const ENV_PORT: &str = "SLIPWAY_PORT";
/// Whether the provider should probe for a free port when the configured
/// one is taken.
pub const ENV_FIND_PORT: &str = "SLIPWAY_FIND_PORT";
/// Readiness budget in whole seconds.
pub const ENV_READY_TIMEOUT: &str = "SLIPWAY_READY_TIMEOUT";
/// Log filter directive (`tracing` env-filter syntax).
pub const ENV_LOG: &str = "SLIPWAY_LOG";
/// Log output format (`compact` or `json`).
pub const ENV_LOG_FORMAT: &str = "SLIPWAY_LOG_FORMAT";
/// Resource roots visible to a spawned provider, colon-separated. Set by the
/// spawner, never by hand.
pub const ENV_RESOURCE_ROOTS: &str = "SLIPWAY_RESOURCE_ROOTS";
/// Base URL of the running provider, exported to commands run under `exec`.
pub const ENV_BASE_URL: &str = "SLIPWAY_BASE_URL";
/// Document root served by the static backend, relative to the working
/// directory unless absolute.
pub const ENV_STATIC_ROOT: &str = "SLIPWAY_STATIC_ROOT";
/// Context path prefix for the static backend's base URL.
pub const ENV_STATIC_CONTEXT_PATH: &str = "SLIPWAY_STATIC_CONTEXT_PATH";

/// Listen port used when nothing else is configured.
pub const DEFAULT_PORT: u16 = 8080;
/// Free-port probing is off unless asked for.
pub const DEFAULT_FIND_PORT: bool = false;
/// Readiness budget used when nothing else is configured.
pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 30;
/// Registry id used when no `--id` is given.
pub const DEFAULT_PROVIDER_ID: &str = "default";
/// Implementation resolved when no name is configured.
pub const DEFAULT_IMPLEMENTATION: &str = "slipway-static";
/// Log filter applied when `SLIPWAY_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Keys copied verbatim from the host environment into a spawned provider's
/// scrubbed environment. Everything else the child needs is set explicitly
/// by the spawner.
pub const PROVIDER_ENV_PASSTHROUGH: &[&str] = &[
    ENV_LOG,
    ENV_LOG_FORMAT,
    ENV_STATIC_ROOT,
    ENV_STATIC_CONTEXT_PATH,
];

/// Failures while resolving configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value failed to parse for its key.
    #[error("invalid value `{value}` for {key}")]
    InvalidValue {
        /// Key the value was resolved for.
        key: &'static str,
        /// Offending value.
        value: String,
    },
    /// The working directory could not be determined.
    #[error("working directory could not be determined")]
    WorkingDir {
        /// Underlying I/O failure.
        #[source]
        source: Arc<io::Error>,
    },
    /// A path was not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },
    /// A directory under the working directory could not be created.
    #[error("could not create directory {path}")]
    CreateDir {
        /// Directory that failed to materialise.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: Arc<io::Error>,
    },
}

/// Environment lookup backed by the real process environment.
#[must_use]
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Resolves the listen port, defaulting to [`DEFAULT_PORT`].
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] when the configured value is not a
/// valid port number.
pub fn resolve_port(lookup: impl Fn(&str) -> Option<String>) -> Result<u16, ConfigError> {
    match lookup(ENV_PORT) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: ENV_PORT,
                value,
            }),
        None => Ok(DEFAULT_PORT),
    }
}

/// Resolves the free-port toggle, defaulting to [`DEFAULT_FIND_PORT`].
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] when the configured value is not a
/// recognised boolean.
pub fn resolve_find_port(lookup: impl Fn(&str) -> Option<String>) -> Result<bool, ConfigError> {
    match lookup(ENV_FIND_PORT) {
        Some(value) => parse_bool(ENV_FIND_PORT, &value),
        None => Ok(DEFAULT_FIND_PORT),
    }
}

/// Resolves the readiness budget, defaulting to
/// [`DEFAULT_READY_TIMEOUT_SECS`]. The unit is whole seconds everywhere a
/// timeout is configured.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] when the configured value is not a
/// non-negative integer.
pub fn resolve_ready_timeout(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Duration, ConfigError> {
    let seconds = match lookup(ENV_READY_TIMEOUT) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: ENV_READY_TIMEOUT,
                value,
            })?,
        None => DEFAULT_READY_TIMEOUT_SECS,
    };
    Ok(Duration::from_secs(seconds))
}

/// Resolves the implementation name, defaulting to
/// [`DEFAULT_IMPLEMENTATION`].
#[must_use]
pub fn resolve_implementation(lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup(ENV_IMPLEMENTATION).unwrap_or_else(|| DEFAULT_IMPLEMENTATION.to_owned())
}

/// Resolves the working directory: explicit override, then the environment,
/// then the current directory.
///
/// # Errors
///
/// Returns [`ConfigError::WorkingDir`] when the current directory cannot be
/// read and [`ConfigError::NonUtf8Path`] when it is not valid UTF-8.
pub fn resolve_working_dir(
    override_dir: Option<&Utf8Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Utf8PathBuf, ConfigError> {
    if let Some(dir) = override_dir {
        return Ok(dir.to_owned());
    }
    if let Some(dir) = lookup(ENV_WORKING_DIR) {
        return Ok(Utf8PathBuf::from(dir));
    }
    let current = std::env::current_dir().map_err(|source| ConfigError::WorkingDir {
        source: Arc::new(source),
    })?;
    Utf8PathBuf::from_path_buf(current).map_err(|other| ConfigError::NonUtf8Path {
        path: other.display().to_string(),
    })
}

/// Resolves `dir` against the working directory and creates it when missing.
/// Absolute paths pass through untouched (but are still created).
///
/// # Errors
///
/// Returns [`ConfigError::CreateDir`] when the directory cannot be created.
pub fn resolve_under_working_dir(
    working_dir: &Utf8Path,
    dir: &Utf8Path,
) -> Result<Utf8PathBuf, ConfigError> {
    let resolved = if dir.is_absolute() {
        dir.to_owned()
    } else {
        working_dir.join(dir)
    };
    std::fs::create_dir_all(&resolved).map_err(|source| ConfigError::CreateDir {
        path: resolved.clone(),
        source: Arc::new(source),
    })?;
    Ok(resolved)
}

/// Captures the passthrough keys present in the host environment, in the
/// shape [`std::process::Command::envs`] accepts.
#[must_use]
pub fn passthrough_env(lookup: impl Fn(&str) -> Option<String>) -> Vec<(String, String)> {
    PROVIDER_ENV_PASSTHROUGH
        .iter()
        .filter_map(|key| lookup(key).map(|value| ((*key).to_owned(), value)))
        .collect()
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        Ok(false)
    } else {
        Err(ConfigError::InvalidValue {
            key,
            value: value.to_owned(),
        })
    }
}

/// Settings a backend resolves from its scrubbed environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    port: u16,
    find_port: bool,
    working_dir: Utf8PathBuf,
}

impl ProviderSettings {
    /// Builds settings from explicit values.
    #[must_use]
    pub const fn new(port: u16, find_port: bool, working_dir: Utf8PathBuf) -> Self {
        Self {
            port,
            find_port,
            working_dir,
        }
    }

    /// Resolves settings through the given lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when any value fails to parse or the
    /// working directory cannot be determined.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            port: resolve_port(&lookup)?,
            find_port: resolve_find_port(&lookup)?,
            working_dir: resolve_working_dir(None, &lookup)?,
        })
    }

    /// Resolves settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when any value fails to parse or the
    /// working directory cannot be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(process_env)
    }

    /// Configured listen port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Whether to probe for a free port when the configured one is taken.
    #[must_use]
    pub const fn find_port(&self) -> bool {
        self.find_port
    }

    /// Working directory backend-relative paths resolve against.
    #[must_use]
    pub fn working_dir(&self) -> &Utf8Path {
        &self.working_dir
    }
}
