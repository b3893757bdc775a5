//! End-to-end tests of the `slipway` binary's goal surface.
//!
//! The binary is run the way a build would run it, against the workspace's
//! own backend binaries. Ambient `SLIPWAY_*` variables are scrubbed so the
//! assertions only see what each test passes explicitly.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::predicate;
use slipway_api::config;
use slipway_e2e::{SupportError, binary_dir, utf8_path};
use tempfile::TempDir;
use thiserror::Error;

#[derive(Debug, Error)]
enum TestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("support error: {0}")]
    Support(#[from] SupportError),
}

#[expect(
    deprecated,
    reason = "assert_cmd::cargo::cargo_bin resolves workspace binaries for e2e tests"
)]
fn slipway_binary() -> PathBuf {
    assert_cmd::cargo::cargo_bin("slipway")
}

#[expect(
    deprecated,
    reason = "assert_cmd::cargo::cargo_bin resolves workspace binaries for e2e tests"
)]
fn echo_binary() -> PathBuf {
    assert_cmd::cargo::cargo_bin("slipway-echo")
}

/// A `slipway` invocation with the ambient configuration scrubbed away.
fn slipway() -> Command {
    let mut command = Command::new(slipway_binary());
    for key in [
        config::ENV_IMPLEMENTATION,
        config::ENV_SCOPE,
        config::ENV_RESOURCES,
        config::ENV_WORKING_DIR,
        config::ENV_PORT,
        config::ENV_FIND_PORT,
        config::ENV_READY_TIMEOUT,
        config::ENV_LOG,
        config::ENV_LOG_FORMAT,
    ] {
        command.env_remove(key);
    }
    command
}

/// Flags pointing a goal at the echo backend on an ephemeral port.
fn echo_flags(working_dir: &TempDir) -> Result<Vec<String>, TestError> {
    let resources = binary_dir(&echo_binary())?;
    let dir = utf8_path(working_dir.path())?;
    Ok(vec![
        "--implementation".to_owned(),
        "slipway-echo".to_owned(),
        "--resource".to_owned(),
        resources.into_string(),
        "--working-dir".to_owned(),
        dir.into_string(),
        "--port".to_owned(),
        "0".to_owned(),
    ])
}

#[test]
fn stopping_an_absent_id_reports_a_friendly_no_op() {
    slipway()
        .args(["stop", "--id", "ghost"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "nothing registered under `ghost`, nothing to stop",
        ));
}

#[test]
fn start_prints_the_ready_location() -> Result<(), TestError> {
    let working_dir = TempDir::new()?;
    slipway()
        .arg("start")
        .args(echo_flags(&working_dir)?)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "provider `default` ready at tcp://localhost:",
        ));
    Ok(())
}

#[test]
fn an_unknown_implementation_fails_with_its_name() -> Result<(), TestError> {
    let working_dir = TempDir::new()?;
    let dir = utf8_path(working_dir.path())?;
    slipway()
        .args([
            "start",
            "--implementation",
            "absent-backend",
            "--resource",
            dir.as_str(),
            "--working-dir",
            dir.as_str(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent-backend"));
    Ok(())
}

#[cfg(unix)]
mod unix {
    use rstest::rstest;

    use super::{TestError, echo_flags, slipway};
    use tempfile::TempDir;

    #[rstest]
    #[case::success(0)]
    #[case::failure(7)]
    fn exec_propagates_the_command_exit_code(#[case] code: i32) -> Result<(), TestError> {
        let working_dir = TempDir::new()?;
        let mut command = slipway();
        command.arg("exec").args(echo_flags(&working_dir)?);
        command.args(["--", "sh", "-c"]);
        command.arg(format!("exit {code}"));
        command.assert().code(code);
        Ok(())
    }

    #[test]
    fn exec_exports_the_service_location() -> Result<(), TestError> {
        let working_dir = TempDir::new()?;
        let mut command = slipway();
        command.arg("exec").args(echo_flags(&working_dir)?);
        command.args([
            "--",
            "sh",
            "-c",
            r#"test -n "$SLIPWAY_PORT" && test -n "$SLIPWAY_BASE_URL""#,
        ]);
        command.assert().success();
        Ok(())
    }
}
