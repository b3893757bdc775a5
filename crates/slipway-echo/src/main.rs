//! Stdio entry point for the echo backend.

use std::io;
use std::process::ExitCode;

use slipway_api::config::ProviderSettings;
use slipway_api::harness::{ProviderHarness, register_termination};
use slipway_api::telemetry;
use tracing::error;

mod service;

use service::EchoService;

fn main() -> ExitCode {
    if let Err(error) = telemetry::init_from_env() {
        eprintln!("slipway-echo: {error}");
        return ExitCode::FAILURE;
    }
    let settings = match ProviderSettings::from_env() {
        Ok(settings) => settings,
        Err(error) => {
            error!(error = %error, "invalid backend settings");
            return ExitCode::FAILURE;
        }
    };
    let service = EchoService::new(settings);
    if let Err(error) = register_termination(service.shutdown_flag()) {
        error!(error = %error, "failed to register termination signals");
    }
    let harness = ProviderHarness::new("slipway-echo", service);
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
