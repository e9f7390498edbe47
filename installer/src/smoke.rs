//! Post-install smoke test.
//!
//! Runs the descriptor's test command from `<prefix>/bin` with a timeout and
//! checks its exit code and, optionally, its output.

use crate::deps::CommandExecutor;
use crate::error::{InstallerError, Result};
use crate::install::BIN_DIR;
use camino::Utf8Path;
use keg_descriptor::PackageDescriptor;
use keg_descriptor::procedure::TestProcedure;
use log::debug;
use std::time::Duration;

/// Default time allowed for the smoke test to finish.
pub const DEFAULT_SMOKE_TEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The result of a smoke test that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmokeOutcome {
    /// The test command ran and met its expectations.
    Passed {
        /// The command line that was run.
        command: String,
    },
    /// The descriptor declares no test procedure.
    NotDeclared,
}

/// Run the descriptor's smoke test against an install at `prefix`.
///
/// # Errors
///
/// Returns [`InstallerError::NotInstalled`] when `prefix` does not exist and
/// [`InstallerError::SmokeTest`] when the executable is missing, times out,
/// exits with an unexpected code, or does not print the expected output.
pub fn smoke_test(
    descriptor: &PackageDescriptor,
    prefix: &Utf8Path,
    executor: &dyn CommandExecutor,
    timeout: Duration,
) -> Result<SmokeOutcome> {
    if !prefix.is_dir() {
        return Err(InstallerError::NotInstalled {
            prefix: prefix.to_path_buf(),
        });
    }
    let Some(procedure) = descriptor.test_procedure() else {
        return Ok(SmokeOutcome::NotDeclared);
    };

    let command = procedure.to_string();
    let failed = |reason: String| InstallerError::SmokeTest {
        command: command.clone(),
        reason,
    };

    let executable = prefix.join(BIN_DIR).join(procedure.command());
    if !executable.exists() {
        return Err(failed(format!("{executable} does not exist")));
    }

    let args: Vec<&str> = procedure.args().iter().map(String::as_str).collect();
    debug!("smoke testing {} with `{command}`", descriptor.name());
    let output = executor
        .run_with_timeout(executable.as_str(), &args, timeout)
        .map_err(|err| failed(format!("could not run {executable}: {err}")))?
        .ok_or_else(|| failed(format!("timed out after {}s", timeout.as_secs())))?;

    check_output(procedure, &output).map_err(failed)?;
    Ok(SmokeOutcome::Passed { command })
}

fn check_output(procedure: &TestProcedure, output: &std::process::Output) -> std::result::Result<(), String> {
    let expected = procedure.expected_exit_code();
    match output.status.code() {
        Some(code) if code == expected => {}
        Some(code) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "exited with code {code}, expected {expected}: {}",
                stderr.trim()
            ));
        }
        None => return Err("terminated by a signal".to_owned()),
    }

    if let Some(needle) = procedure.expected_output() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.contains(needle) && !stderr.contains(needle) {
            return Err(format!("output does not contain \"{needle}\""));
        }
    }
    Ok(())
}
