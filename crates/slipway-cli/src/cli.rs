//! Command-line surface of the `slipway` binary.
//!
//! Parsing stays declarative: every flag that has an environment fallback is
//! optional here, and [`crate::goals`] resolves the final value so precedence
//! (flag over environment over default) lives in one place.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use slipway_api::config::DEFAULT_PROVIDER_ID;

/// Starts, watches and stops embedded development services.
#[derive(Debug, Parser)]
#[command(name = "slipway", version, about)]
pub struct Cli {
    /// Log output format (`compact` or `json`).
    #[arg(long, global = true, value_name = "FORMAT")]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Build-phase goals the binary can execute.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a provider in the foreground and block until it exits.
    Run(GoalArgs),
    /// Start a provider, wait for readiness, report and return.
    Start(StartArgs),
    /// Stop the provider registered under an id.
    Stop(StopArgs),
    /// Start a provider, run a command against it, then stop it.
    Exec(ExecArgs),
}

/// Flags shared by every goal that brings a provider up.
#[derive(Debug, Args)]
pub struct GoalArgs {
    /// Registry id for the provider instance.
    #[arg(long, default_value = DEFAULT_PROVIDER_ID)]
    pub id: String,

    /// Implementation name resolved inside the isolation context.
    #[arg(long, value_name = "NAME")]
    pub implementation: Option<String>,

    /// Resolution scope: `compile`, `runtime` or `test`. Unknown values
    /// fall back to `test`.
    #[arg(long, value_name = "SCOPE")]
    pub scope: Option<String>,

    /// Resource root visible to the provider, `[scope:]path`. Repeatable.
    #[arg(long = "resource", value_name = "[SCOPE:]PATH")]
    pub resources: Vec<String>,

    /// Working directory handed to the provider.
    #[arg(long, value_name = "DIR")]
    pub working_dir: Option<Utf8PathBuf>,

    /// Port the provider should listen on.
    #[arg(long)]
    pub port: Option<u16>,

    /// Probe upwards for a free port when the configured one is taken.
    #[arg(long)]
    pub find_port: bool,

    /// Seconds to wait for the provider to become ready.
    #[arg(long, value_name = "SECONDS")]
    pub ready_timeout: Option<u64>,
}

/// Arguments of the `start` goal.
#[derive(Debug, Args)]
pub struct StartArgs {
    #[command(flatten)]
    pub goal: GoalArgs,

    /// Stay in the foreground instead of registering the provider.
    #[arg(long)]
    pub block: bool,
}

/// Arguments of the `stop` goal.
#[derive(Debug, Args)]
pub struct StopArgs {
    /// Registry id to stop.
    #[arg(long, default_value = DEFAULT_PROVIDER_ID)]
    pub id: String,
}

/// Arguments of the `exec` goal.
#[derive(Debug, Args)]
pub struct ExecArgs {
    #[command(flatten)]
    pub goal: GoalArgs,

    /// Command to run while the provider is up. Everything after `--` is
    /// passed through verbatim.
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use rstest::rstest;

    use super::{Cli, Command};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn start_defaults_leave_fallbacks_to_resolution() {
        let cli = parse(&["slipway", "start"]);
        let Command::Start(args) = cli.command else {
            panic!("expected the start goal");
        };
        assert_eq!(args.goal.id, "default");
        assert!(args.goal.implementation.is_none());
        assert!(args.goal.resources.is_empty());
        assert!(!args.block);
    }

    #[test]
    fn resources_accumulate_in_order() {
        let cli = parse(&[
            "slipway",
            "start",
            "--resource",
            "test:/fixtures",
            "--resource",
            "/srv/site",
        ]);
        let Command::Start(args) = cli.command else {
            panic!("expected the start goal");
        };
        assert_eq!(args.goal.resources, ["test:/fixtures", "/srv/site"]);
    }

    #[test]
    fn exec_captures_the_trailing_command_verbatim() {
        let cli = parse(&[
            "slipway", "exec", "--port", "9000", "--", "npm", "test", "--silent",
        ]);
        let Command::Exec(args) = cli.command else {
            panic!("expected the exec goal");
        };
        assert_eq!(args.goal.port, Some(9000));
        assert_eq!(args.command, ["npm", "test", "--silent"]);
    }

    #[test]
    fn exec_requires_a_command() {
        assert!(Cli::try_parse_from(["slipway", "exec"]).is_err());
    }

    #[rstest]
    #[case::run(&["slipway", "run", "--implementation", "slipway-echo"])]
    #[case::stop(&["slipway", "stop", "--id", "pact"])]
    #[case::blocking(&["slipway", "start", "--block"])]
    fn goal_variants_parse(#[case] args: &[&str]) {
        let _ = parse(args);
    }

    #[test]
    fn log_format_is_global() {
        let cli = parse(&["slipway", "start", "--log-format", "json"]);
        assert_eq!(cli.log_format.as_deref(), Some("json"));
    }
}
