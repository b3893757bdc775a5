//! Tracing bootstrap shared by the binaries.
//!
//! Every slipway binary funnels its diagnostics through `tracing`; user-facing
//! output never does. The subscriber writes to stderr so the control channel
//! on stdout stays clean, which also means a backend's logs surface in the
//! host's terminal through the inherited stderr.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{self, ConfigError, DEFAULT_LOG_FILTER, ENV_LOG, ENV_LOG_FORMAT};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Output encoding for log lines.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Single-line human-readable output.
    #[default]
    Compact,
    /// Structured JSON output.
    Json,
}

/// Failures while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive failed to parse.
    #[error("invalid log filter `{directive}`")]
    Filter {
        /// Offending directive.
        directive: String,
        /// Underlying parse failure.
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    /// A global subscriber was already installed outside this module.
    #[error("global subscriber could not be installed")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Resolves the log filter directive, defaulting to
/// [`DEFAULT_LOG_FILTER`].
#[must_use]
pub fn resolve_filter(lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup(ENV_LOG).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned())
}

/// Resolves the log format, defaulting to [`LogFormat::Compact`].
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] when the configured value names no
/// known format.
pub fn resolve_format(lookup: impl Fn(&str) -> Option<String>) -> Result<LogFormat, ConfigError> {
    match lookup(ENV_LOG_FORMAT) {
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            key: ENV_LOG_FORMAT,
            value,
        }),
        None => Ok(LogFormat::default()),
    }
}

/// Installs the global subscriber once; later calls are no-ops.
///
/// # Errors
///
/// Returns a [`TelemetryError`] when the filter does not parse or another
/// subscriber is already installed.
pub fn init(filter: &str, format: LogFormat) -> Result<(), TelemetryError> {
    TELEMETRY_GUARD.get_or_try_init(|| install(filter, format))?;
    Ok(())
}

/// Convenience wrapper: resolves filter and format from the process
/// environment, then calls [`init`].
///
/// # Errors
///
/// Returns a [`TelemetryError`] when installation fails. An unparseable
/// format value falls back to the default rather than failing startup.
pub fn init_from_env() -> Result<(), TelemetryError> {
    let filter = resolve_filter(config::process_env);
    let format = resolve_format(config::process_env).unwrap_or_default();
    init(&filter, format)
}

fn install(filter: &str, format: LogFormat) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_new(filter).map_err(|source| TelemetryError::Filter {
        directive: filter.to_owned(),
        source,
    })?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Compact => {
            tracing::subscriber::set_global_default(builder.compact().finish())?;
        }
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.json().finish())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("compact", LogFormat::Compact)]
    #[case("JSON", LogFormat::Json)]
    #[case("Json", LogFormat::Json)]
    fn format_parses_case_insensitively(#[case] raw: &str, #[case] expected: LogFormat) {
        let format: LogFormat = raw.parse().expect("parse");
        assert_eq!(format, expected);
    }

    #[test]
    fn format_round_trips_through_display() {
        assert_eq!(LogFormat::Compact.to_string(), "compact");
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    #[test]
    fn resolve_format_rejects_unknown_values() {
        let err = resolve_format(|_| Some("xml".to_owned())).expect_err("must fail");
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == ENV_LOG_FORMAT));
    }

    #[test]
    fn resolve_filter_defaults_to_info() {
        assert_eq!(resolve_filter(|_| None), DEFAULT_LOG_FILTER);
        assert_eq!(resolve_filter(|_| Some("debug".to_owned())), "debug");
    }

    #[test]
    fn init_is_idempotent() {
        init(DEFAULT_LOG_FILTER, LogFormat::Compact).expect("first init");
        init("debug", LogFormat::Json).expect("second init is a no-op");
    }
}
