//! External command execution and build dependency checks.
//!
//! Every process keg starts goes through [`CommandExecutor`], so the install
//! and smoke-test stages can be exercised with a stub that records the exact
//! command sequence instead of spawning Python.

use crate::error::{InstallerError, Result};
use keg_descriptor::dependency::BuildDependency;
use log::{debug, trace};
use std::io::{self, Read};
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the command.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use keg_installer::deps::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("python3", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), keg_installer::error::InstallerError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output>;

    /// Runs a command, killing it if it does not finish within `timeout`.
    ///
    /// Returns `Ok(None)` when the command timed out.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or waiting for the
    /// command.
    fn run_with_timeout(&self, cmd: &str, args: &[&str], timeout: Duration)
    -> Result<Option<Output>>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        trace!("running {cmd} {}", args.join(" "));
        Command::new(cmd)
            .args(args)
            .output()
            .map_err(InstallerError::from)
    }

    fn run_with_timeout(
        &self,
        cmd: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Option<Output>> {
        trace!(
            "running {cmd} {} with a {}s timeout",
            args.join(" "),
            timeout.as_secs()
        );
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes while waiting so a chatty child never blocks on a
        // full pipe buffer.
        let stdout_reader = drain(child.stdout.take());
        let stderr_reader = drain(child.stderr.take());

        match child.wait_timeout(timeout)? {
            Some(status) => Ok(Some(Output {
                status,
                stdout: collect(stdout_reader)?,
                stderr: collect(stderr_reader)?,
            })),
            None => {
                // Best effort: the process may already have exited. The
                // readers are detached since a grandchild may still hold
                // the pipes open.
                let _ = child.kill();
                let _ = child.wait();
                Ok(None)
            }
        }
    }
}

fn drain<R>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut reader) = pipe {
            reader.read_to_end(&mut buffer)?;
        }
        Ok(buffer)
    })
}

fn collect(reader: JoinHandle<io::Result<Vec<u8>>>) -> Result<Vec<u8>> {
    let bytes = reader
        .join()
        .map_err(|_| io::Error::other("output reader thread panicked"))??;
    Ok(bytes)
}

/// Checks every build dependency by running its executable with `--version`.
///
/// The version is read from stdout, falling back to stderr for interpreters
/// that print it there.
///
/// # Errors
///
/// Returns [`InstallerError::Dependency`] for the first dependency that
/// cannot be run, exits unsuccessfully, or reports a version outside its
/// constraint.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use keg_descriptor::load_descriptor;
/// use keg_installer::deps::{SystemCommandExecutor, check_build_dependencies};
///
/// let descriptor = load_descriptor(Utf8Path::new("formulae/gen-commit.toml"))?;
/// check_build_dependencies(&SystemCommandExecutor, descriptor.build_dependencies())?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn check_build_dependencies(
    executor: &dyn CommandExecutor,
    dependencies: &[BuildDependency],
) -> Result<()> {
    dependencies
        .iter()
        .try_for_each(|dependency| check_dependency(executor, dependency))
}

fn check_dependency(executor: &dyn CommandExecutor, dependency: &BuildDependency) -> Result<()> {
    let executable = dependency.executable();
    let unsatisfied = |reason: String| InstallerError::Dependency {
        dependency: dependency.to_string(),
        reason,
    };

    let output = executor
        .run(&executable, &["--version"])
        .map_err(|err| unsatisfied(format!("could not run `{executable} --version`: {err}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(unsatisfied(format!(
            "`{executable} --version` exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let reported = version_text(&output);
    if !dependency.is_satisfied_by(&reported) {
        return Err(unsatisfied(format!(
            "`{executable}` reports \"{}\"",
            reported.trim()
        )));
    }

    debug!("dependency {dependency} satisfied by {executable}: {}", reported.trim());
    Ok(())
}

fn version_text(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
        String::from_utf8_lossy(&output.stderr).into_owned()
    } else {
        stdout.into_owned()
    }
}

#[cfg(test)]
mod tests;
