//! Stdio entry point for the static-file backend.

use std::io;
use std::process::ExitCode;

use slipway_api::config::{self, ProviderSettings};
use slipway_api::harness::{ProviderHarness, register_termination};
use slipway_api::telemetry;
use tracing::error;

mod http;
mod service;

use service::{StaticService, StaticSettings};

fn main() -> ExitCode {
    if let Err(error) = telemetry::init_from_env() {
        eprintln!("slipway-static: {error}");
        return ExitCode::FAILURE;
    }
    let settings = match ProviderSettings::from_env() {
        Ok(settings) => settings,
        Err(error) => {
            error!(error = %error, "invalid backend settings");
            return ExitCode::FAILURE;
        }
    };
    let content = match StaticSettings::resolve(settings.working_dir(), config::process_env) {
        Ok(content) => content,
        Err(error) => {
            error!(error = %error, "invalid static content settings");
            return ExitCode::FAILURE;
        }
    };
    let service = StaticService::new(settings, content);
    if let Err(error) = register_termination(service.shutdown_flag()) {
        error!(error = %error, "failed to register termination signals");
    }
    let harness = ProviderHarness::new("slipway-static", service);
    let stdin = io::stdin();
    let stdout = io::stdout();
    match harness.run(stdin.lock(), stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(error = %error, "control loop failed");
            ExitCode::FAILURE
        }
    }
}
