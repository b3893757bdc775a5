//! Command-line runtime of the slipway build tool.
//!
//! One invocation executes one goal. A goal that starts a provider spawns
//! the implementation inside an isolation context, verifies the provider
//! contract over the child's control channel, launches the service, polls
//! it ready and registers the handle; stopping looks the handle up,
//! forwards the stop and removes the entry. The registry is owned here and
//! threaded through the goal handlers, so goals composed in one process,
//! such as the legs of `exec`, share the providers they started.

pub mod adapter;
pub mod cli;
pub mod goals;
pub mod lifecycle;
pub mod output;
pub mod registry;

#[cfg(test)]
mod tests;

use std::error::Error as _;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use slipway_api::telemetry::{self, LogFormat};
use slipway_api::{config, harness};
use tracing::{error, warn};

use crate::cli::Cli;
use crate::goals::GoalRunner;
use crate::lifecycle::LifecycleError;
use crate::output::GoalOutput;
use crate::registry::ProviderRegistry;

const CLI_TARGET: &str = "slipway::cli";

/// Runs one parsed invocation against the real process environment.
///
/// Telemetry goes to stderr; deliberate goal output goes to `stdout`.
/// Returns the process exit code: the wrapped command's code for `exec`,
/// zero or one for everything else.
pub fn run<W: Write, E: Write>(cli: &Cli, stdout: W, stderr: E) -> ExitCode {
    let mut out = GoalOutput::new(stdout, stderr);

    let format = match cli.log_format.as_deref() {
        Some(raw) => match raw.parse::<LogFormat>() {
            Ok(format) => format,
            Err(_) => {
                let _ = out.stderr_line(format_args!("error: unknown log format `{raw}`"));
                return ExitCode::FAILURE;
            }
        },
        None => telemetry::resolve_format(config::process_env).unwrap_or_default(),
    };
    let filter = telemetry::resolve_filter(config::process_env);
    if let Err(error) = telemetry::init(&filter, format) {
        let _ = out.stderr_line(format_args!("error: {error}"));
        return ExitCode::FAILURE;
    }

    let interrupt = Arc::new(AtomicBool::new(false));
    if let Err(error) = harness::register_termination(&interrupt) {
        // Without handlers a signal kills the process outright instead of
        // aborting the current wait; the goal itself can still proceed.
        warn!(target: CLI_TARGET, %error, "signal handlers could not be installed");
    }

    let mut registry = ProviderRegistry::new();
    let mut runner = GoalRunner::new(&mut registry, &interrupt, config::process_env);
    match runner.dispatch(&cli.command, &mut out) {
        Ok(code) => ExitCode::from(exit_code_value(code)),
        Err(error) => {
            let message = render_error_chain(&error);
            error!(target: CLI_TARGET, %message, "goal failed");
            let _ = out.stderr_line(format_args!("error: {message}"));
            ExitCode::FAILURE
        }
    }
}

/// Clamps a goal's exit code into the byte range the process can report.
fn exit_code_value(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

/// Renders an error with its source chain, outermost first.
fn render_error_chain(error: &LifecycleError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
