//! Spawning a resolved implementation inside its context.

use std::process::{Child, Command, Stdio};
use std::sync::Arc;

use camino::Utf8PathBuf;
use tracing::debug;

use slipway_api::config::{
    ENV_FIND_PORT, ENV_PORT, ENV_RESOURCE_ROOTS, ENV_WORKING_DIR, ProviderSettings,
};

use crate::context::IsolationContext;
use crate::error::IsolateError;

const ISOLATE_TARGET: &str = "slipway::isolate";

impl IsolationContext {
    /// Builds the command that would start `name`, without spawning it.
    ///
    /// The child's environment is cleared and rebuilt from scratch: the
    /// provider settings, the context's own resource roots, and the given
    /// passthrough pairs. Stdin and stdout are piped for the control
    /// channel; stderr is inherited so backend logs surface in the host's
    /// terminal.
    ///
    /// # Errors
    ///
    /// Returns [`IsolateError::ImplementationNotFound`] when `name` does not
    /// resolve, and [`IsolateError::NotInstantiable`] when the resolved path
    /// cannot be made absolute.
    pub fn command(
        &self,
        name: &str,
        settings: &ProviderSettings,
        passthrough: &[(String, String)],
    ) -> Result<Command, IsolateError> {
        let executable = absolute(self.resolve(name)?, name)?;
        let mut command = Command::new(executable.as_std_path());
        command.env_clear();
        command.env(ENV_PORT, settings.port().to_string());
        command.env(ENV_FIND_PORT, settings.find_port().to_string());
        command.env(ENV_WORKING_DIR, settings.working_dir().as_str());
        command.env(ENV_RESOURCE_ROOTS, self.joined_roots());
        command.envs(
            passthrough
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
        );
        command.current_dir(settings.working_dir().as_std_path());
        command.stdin(Stdio::piped());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::inherit());
        Ok(command)
    }

    /// Resolves `name` and starts it inside the context.
    ///
    /// # Errors
    ///
    /// Returns [`IsolateError::ImplementationNotFound`] when `name` does not
    /// resolve and [`IsolateError::NotInstantiable`] when the OS refuses to
    /// start the resolved executable.
    pub fn spawn_implementation(
        &self,
        name: &str,
        settings: &ProviderSettings,
        passthrough: &[(String, String)],
    ) -> Result<Child, IsolateError> {
        let mut command = self.command(name, settings, passthrough)?;
        debug!(
            target: ISOLATE_TARGET,
            implementation = name,
            scope = %self.scope(),
            roots = self.roots().len(),
            "spawning isolated implementation"
        );
        command.spawn().map_err(|source| IsolateError::NotInstantiable {
            name: name.to_owned(),
            source: Arc::new(source),
        })
    }

    /// Roots in the colon-separated form handed to the child.
    fn joined_roots(&self) -> String {
        self.roots()
            .iter()
            .map(|root| root.as_str())
            .collect::<Vec<_>>()
            .join(":")
    }
}

/// The spawn changes the child's working directory, so a root given as a
/// host-relative path must be pinned before it leaves the host.
fn absolute(path: Utf8PathBuf, name: &str) -> Result<Utf8PathBuf, IsolateError> {
    if path.is_absolute() {
        return Ok(path);
    }
    let pinned = std::path::absolute(path.as_std_path()).map_err(|source| {
        IsolateError::NotInstantiable {
            name: name.to_owned(),
            source: Arc::new(source),
        }
    })?;
    Utf8PathBuf::from_path_buf(pinned).map_err(|other| IsolateError::NotInstantiable {
        name: name.to_owned(),
        source: Arc::new(std::io::Error::other(format!(
            "resolved path is not valid UTF-8: {}",
            other.display()
        ))),
    })
}
