//! Start/stop orchestration of provider lifecycles.

use std::sync::atomic::AtomicBool;

use slipway_api::config::ProviderSettings;
use slipway_isolate::IsolationContext;
use tracing::{debug, info, warn};

use super::error::LifecycleError;
use super::poll::{PollFailure, PollOutcome, PollPolicy, wait_until};
use crate::adapter::ProcessProvider;
use crate::registry::{ProviderHandle, ProviderRegistry};

const LIFECYCLE_TARGET: &str = "slipway::lifecycle";

/// Everything needed to bring one provider up.
#[derive(Debug, Clone)]
pub struct StartPlan {
    /// Registry id the provider will be stored under.
    pub id: String,
    /// Implementation name to resolve inside the isolation context.
    pub implementation: String,
    /// Sealed resolution boundary for the spawn.
    pub context: IsolationContext,
    /// Settings handed to the backend through its scrubbed environment.
    pub settings: ProviderSettings,
    /// Environment pairs passed through to the backend unchanged.
    pub passthrough: Vec<(String, String)>,
    /// Foreground run: the launch blocks and nothing is registered.
    pub block: bool,
    /// Readiness wait policy.
    pub ready: PollPolicy,
}

/// What a successful start produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartReport {
    /// The provider is ready and registered.
    Registered {
        /// Registry id the provider is stored under.
        id: String,
        /// Listening port, when the provider reports one.
        port: Option<u16>,
        /// Base URL, when the provider reports one.
        base_url: Option<String>,
    },
    /// A blocking launch ran in the foreground and has exited.
    Completed,
}

/// What stopping an id amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReport {
    /// A registered provider was stopped and deregistered.
    Stopped {
        /// Registry id that was stopped.
        id: String,
    },
    /// Nothing was registered under the id.
    NotRegistered {
        /// Registry id that had no entry.
        id: String,
    },
}

/// Drives providers from spawn to registration and from stop to removal.
#[derive(Debug)]
pub struct Orchestrator<'a> {
    interrupt: &'a AtomicBool,
    shutdown: PollPolicy,
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator that aborts bounded waits when `interrupt`
    /// is raised.
    #[must_use]
    pub const fn new(interrupt: &'a AtomicBool) -> Self {
        Self {
            interrupt,
            shutdown: PollPolicy::shutdown_default(),
        }
    }

    /// Overrides the shutdown wait policy.
    #[must_use]
    pub const fn with_shutdown_policy(mut self, policy: PollPolicy) -> Self {
        self.shutdown = policy;
        self
    }

    /// Spawns the plan's implementation, verifies its contract, launches
    /// the service and registers the handle once the provider is ready.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] when the implementation cannot be
    /// spawned, fails the contract handshake, fails to launch, or does not
    /// become ready within the plan's budget. On a readiness timeout the
    /// handle is registered regardless, so a later stop can reap the
    /// unresponsive instance.
    pub fn start_and_register(
        &self,
        registry: &mut ProviderRegistry,
        plan: &StartPlan,
    ) -> Result<StartReport, LifecycleError> {
        debug!(
            target: LIFECYCLE_TARGET,
            id = %plan.id,
            implementation = %plan.implementation,
            "starting provider"
        );
        let child = plan.context.spawn_implementation(
            &plan.implementation,
            &plan.settings,
            &plan.passthrough,
        )?;
        let provider = ProcessProvider::connect(child, plan.implementation.as_str())?;
        self.launch_and_register(registry, &plan.id, plan.block, plan.ready, Box::new(provider))
    }

    /// Launches an already instantiated provider and registers it when
    /// ready. Split out from [`Orchestrator::start_and_register`] so the
    /// lifecycle can also be driven with in-process providers.
    ///
    /// # Errors
    ///
    /// Same contract as [`Orchestrator::start_and_register`], minus the
    /// spawn and handshake failures.
    pub fn launch_and_register(
        &self,
        registry: &mut ProviderRegistry,
        id: &str,
        block: bool,
        ready: PollPolicy,
        handle: ProviderHandle,
    ) -> Result<StartReport, LifecycleError> {
        if block {
            info!(target: LIFECYCLE_TARGET, id, "launching in the foreground");
            handle.launch(true)?;
            info!(target: LIFECYCLE_TARGET, id, "foreground run finished");
            return Ok(StartReport::Completed);
        }
        handle.launch(false)?;
        match wait_until(ready, self.interrupt, || handle.is_running()) {
            PollOutcome::Ready => {
                let port = handle.port();
                let base_url = handle.base_url();
                registry.put(id, handle);
                info!(target: LIFECYCLE_TARGET, id, port = ?port, "provider ready");
                Ok(StartReport::Registered {
                    id: id.to_owned(),
                    port,
                    base_url,
                })
            }
            PollOutcome::TimedOut => {
                // Registered even though unready: the stop path must still
                // be able to reach and reap the instance.
                registry.put(id, handle);
                warn!(target: LIFECYCLE_TARGET, id, "provider not ready within budget");
                Err(LifecycleError::ReadinessTimeout {
                    id: id.to_owned(),
                    timeout_secs: ready.timeout().as_secs(),
                })
            }
            PollOutcome::Failed(PollFailure::Interrupted) => Err(LifecycleError::Interrupted {
                id: id.to_owned(),
            }),
        }
    }

    /// Stops whatever is registered under `id` and removes the entry.
    ///
    /// An absent id is a no-op, reported as [`StopReport::NotRegistered`].
    /// The entry is removed before the stop is attempted, so the id is free
    /// again even when the provider refuses to die.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] when the provider's stop fails, the
    /// service keeps running past the shutdown budget, or the wait is
    /// interrupted.
    pub fn stop_registered(
        &self,
        registry: &mut ProviderRegistry,
        id: &str,
    ) -> Result<StopReport, LifecycleError> {
        let Some(handle) = registry.remove(id) else {
            debug!(target: LIFECYCLE_TARGET, id, "nothing registered, stop is a no-op");
            return Ok(StopReport::NotRegistered { id: id.to_owned() });
        };
        handle.stop()?;
        match wait_until(self.shutdown, self.interrupt, || !handle.is_running()) {
            PollOutcome::Ready => {
                info!(target: LIFECYCLE_TARGET, id, "provider stopped");
                Ok(StopReport::Stopped { id: id.to_owned() })
            }
            PollOutcome::TimedOut => Err(LifecycleError::ShutdownTimeout {
                id: id.to_owned(),
                timeout_secs: self.shutdown.timeout().as_secs(),
            }),
            PollOutcome::Failed(PollFailure::Interrupted) => Err(LifecycleError::Interrupted {
                id: id.to_owned(),
            }),
        }
    }
}
