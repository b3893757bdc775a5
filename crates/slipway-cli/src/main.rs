//! Binary entry point for the `slipway` tool.
//!
//! Everything interesting happens in [`slipway_cli::run`]; the binary only
//! parses arguments and hands over locked stdio so goal output and
//! diagnostics keep their streams apart.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use slipway_cli::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let stdout = io::stdout().lock();
    let stderr = io::stderr().lock();
    slipway_cli::run(&cli, stdout, stderr)
}
