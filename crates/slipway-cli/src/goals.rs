//! Goal handlers: the executable meaning of each CLI command.
//!
//! A handler resolves its configuration (flag over environment over
//! default), builds a [`StartPlan`] and drives the orchestrator. The
//! registry is an explicit argument so goals executed in one process, such
//! as the start and stop legs of `exec`, share the providers they started.

use std::io::{self, Write};
use std::process::{Command as HostCommand, ExitStatus};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use slipway_api::config::{self, ProviderSettings};
use slipway_isolate::{ContextProfile, ResolutionScope, ResourceSpec, ResourceSpecError};
use tracing::debug;

use crate::cli::{Command, ExecArgs, GoalArgs, StartArgs, StopArgs};
use crate::lifecycle::{
    LifecycleError, Orchestrator, PollPolicy, StartPlan, StartReport, StopReport,
};
use crate::output::GoalOutput;
use crate::registry::ProviderRegistry;

const GOALS_TARGET: &str = "slipway::goals";

/// Executes goals against an explicit registry.
pub struct GoalRunner<'a, L> {
    registry: &'a mut ProviderRegistry,
    interrupt: &'a AtomicBool,
    lookup: L,
}

impl<'a, L: Fn(&str) -> Option<String>> GoalRunner<'a, L> {
    /// Creates a runner over the given registry, interrupt flag and
    /// configuration lookup.
    pub fn new(registry: &'a mut ProviderRegistry, interrupt: &'a AtomicBool, lookup: L) -> Self {
        Self {
            registry,
            interrupt,
            lookup,
        }
    }

    /// Runs one goal to completion and returns the process exit code.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] when configuration does not resolve or
    /// the goal's lifecycle work fails.
    pub fn dispatch<W: Write, E: Write>(
        &mut self,
        command: &Command,
        out: &mut GoalOutput<W, E>,
    ) -> Result<i32, LifecycleError> {
        match command {
            Command::Run(args) => {
                self.run(args, out)?;
                Ok(0)
            }
            Command::Start(args) => {
                self.start(args, out)?;
                Ok(0)
            }
            Command::Stop(args) => {
                self.stop(args, out)?;
                Ok(0)
            }
            Command::Exec(args) => self.exec(args, out),
        }
    }

    fn run<W: Write, E: Write>(
        &mut self,
        args: &GoalArgs,
        out: &mut GoalOutput<W, E>,
    ) -> Result<(), LifecycleError> {
        let plan = self.plan(args, true)?;
        let orchestrator = Orchestrator::new(self.interrupt);
        match orchestrator.start_and_register(self.registry, &plan)? {
            StartReport::Completed => {
                out.stdout_line(format_args!("service `{}` exited, run complete", plan.id))?;
            }
            StartReport::Registered { id, .. } => {
                out.stdout_line(format_args!("provider `{id}` ready"))?;
            }
        }
        Ok(())
    }

    fn start<W: Write, E: Write>(
        &mut self,
        args: &StartArgs,
        out: &mut GoalOutput<W, E>,
    ) -> Result<(), LifecycleError> {
        let plan = self.plan(&args.goal, args.block)?;
        let orchestrator = Orchestrator::new(self.interrupt);
        match orchestrator.start_and_register(self.registry, &plan)? {
            StartReport::Registered { id, base_url, .. } => {
                let location = base_url.as_deref().unwrap_or("unavailable");
                out.stdout_line(format_args!("provider `{id}` ready at {location}"))?;
            }
            StartReport::Completed => {
                out.stdout_line(format_args!(
                    "provider `{}` ran in the foreground and exited",
                    plan.id
                ))?;
            }
        }
        Ok(())
    }

    fn stop<W: Write, E: Write>(
        &mut self,
        args: &StopArgs,
        out: &mut GoalOutput<W, E>,
    ) -> Result<(), LifecycleError> {
        let orchestrator = Orchestrator::new(self.interrupt);
        match orchestrator.stop_registered(self.registry, &args.id)? {
            StopReport::Stopped { id } => {
                out.stdout_line(format_args!("provider `{id}` stopped"))?;
            }
            StopReport::NotRegistered { id } => {
                out.stdout_line(format_args!(
                    "nothing registered under `{id}`, nothing to stop"
                ))?;
            }
        }
        Ok(())
    }

    /// Start, run the wrapped command against the provider, stop. The stop
    /// leg is attempted even when the command failed, and the command's
    /// exit code is what the goal reports.
    fn exec<W: Write, E: Write>(
        &mut self,
        args: &ExecArgs,
        out: &mut GoalOutput<W, E>,
    ) -> Result<i32, LifecycleError> {
        let plan = self.plan(&args.goal, false)?;
        let orchestrator = Orchestrator::new(self.interrupt);
        let report = orchestrator.start_and_register(self.registry, &plan)?;
        let location = if let StartReport::Registered { base_url, .. } = &report {
            base_url.clone().unwrap_or_else(|| "unavailable".to_owned())
        } else {
            "unavailable".to_owned()
        };
        out.stderr_line(format_args!(
            "running `{}` against {location}",
            args.command.join(" ")
        ))?;

        let command_result = run_command(&args.command, &report);
        let stop_result = orchestrator.stop_registered(self.registry, &plan.id);

        let status = command_result?;
        stop_result?;
        Ok(status.code().unwrap_or(1))
    }

    /// Resolves the full start configuration, flag over environment over
    /// default.
    fn plan(&self, args: &GoalArgs, block: bool) -> Result<StartPlan, LifecycleError> {
        let scope = match args.scope.as_deref() {
            Some(value) => ResolutionScope::from_config_value(value),
            None => match (self.lookup)(config::ENV_SCOPE) {
                Some(value) => ResolutionScope::from_config_value(&value),
                None => ResolutionScope::default(),
            },
        };
        let specs: Vec<ResourceSpec> = if args.resources.is_empty() {
            match (self.lookup)(config::ENV_RESOURCES) {
                Some(value) => parse_resource_list(&value)?,
                None => Vec::new(),
            }
        } else {
            args.resources
                .iter()
                .map(|directive| directive.parse())
                .collect::<Result<_, ResourceSpecError>>()?
        };
        let implementation = args
            .implementation
            .clone()
            .unwrap_or_else(|| config::resolve_implementation(&self.lookup));
        let working_dir = config::resolve_working_dir(args.working_dir.as_deref(), &self.lookup)?;
        let port = match args.port {
            Some(port) => port,
            None => config::resolve_port(&self.lookup)?,
        };
        let find_port = if args.find_port {
            true
        } else {
            config::resolve_find_port(&self.lookup)?
        };
        let ready_timeout = match args.ready_timeout {
            Some(seconds) => Duration::from_secs(seconds),
            None => config::resolve_ready_timeout(&self.lookup)?,
        };
        debug!(
            target: GOALS_TARGET,
            id = %args.id,
            implementation = %implementation,
            scope = %scope,
            "resolved start configuration"
        );
        Ok(StartPlan {
            id: args.id.clone(),
            implementation,
            context: ContextProfile::new(scope).with_resources(specs).seal(),
            settings: ProviderSettings::new(port, find_port, working_dir),
            passthrough: config::passthrough_env(&self.lookup),
            block,
            ready: PollPolicy::ready_default().with_timeout(ready_timeout),
        })
    }
}

/// Parses a comma-separated `[scope:]path` list, as found in the
/// resources environment variable.
fn parse_resource_list(value: &str) -> Result<Vec<ResourceSpec>, ResourceSpecError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::parse)
        .collect()
}

/// Runs the exec goal's command with the provider coordinates exported.
fn run_command(command: &[String], report: &StartReport) -> Result<ExitStatus, LifecycleError> {
    let Some((program, rest)) = command.split_first() else {
        return Err(LifecycleError::CommandSpawn {
            command: String::new(),
            source: Arc::new(io::Error::other("no command given")),
        });
    };
    let mut host = HostCommand::new(program);
    host.args(rest);
    if let StartReport::Registered { port, base_url, .. } = report {
        if let Some(port) = port {
            host.env(config::ENV_PORT, port.to_string());
        }
        if let Some(base_url) = base_url {
            host.env(config::ENV_BASE_URL, base_url);
        }
    }
    let status = host
        .status()
        .map_err(|source| LifecycleError::CommandSpawn {
            command: program.clone(),
            source: Arc::new(source),
        })?;
    Ok(status)
}
