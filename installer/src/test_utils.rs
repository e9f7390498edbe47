//! Shared test utilities for the installer crate.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! behaviour tests under `tests/`.

use crate::deps::CommandExecutor;
use crate::error::{InstallerError, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use keg_descriptor::Sha256Digest;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::time::Duration;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
pub fn success_output() -> Output {
    stdout_output("")
}

/// Creates a successful command `Output` with the given stdout.
pub fn stdout_output(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "python3.12").
    pub cmd: String,
    /// The arguments to pass to the command.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
    /// Files the stub creates when the call succeeds, standing in for the
    /// side effects of the real command.
    pub creates: Vec<PathBuf>,
    /// Whether `run_with_timeout` should report a timeout.
    pub timed_out: bool,
}

impl ExpectedCall {
    /// Expect `cmd` with `args`, answering with `result`.
    pub fn new<I, S>(cmd: impl Into<String>, args: I, result: Result<Output>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cmd: cmd.into(),
            args: args.into_iter().map(Into::into).collect(),
            result,
            creates: Vec::new(),
            timed_out: false,
        }
    }

    /// Create an executable stub file at `path` when the call is made.
    #[must_use]
    pub fn creating(mut self, path: impl Into<PathBuf>) -> Self {
        self.creates.push(path.into());
        self
    }

    /// Report the call as having exceeded its timeout.
    #[must_use]
    pub const fn timing_out(mut self) -> Self {
        self.timed_out = true;
        self
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
/// Unexpected or mismatched invocations are returned as
/// [`InstallerError::StubMismatch`] so the failing stage surfaces them.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    invocations: RefCell<Vec<String>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            invocations: RefCell::new(Vec::new()),
        }
    }

    /// Every command line received so far, as `cmd arg1 arg2`.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations.borrow().clone()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        let remaining: Vec<String> = self
            .expected
            .borrow()
            .iter()
            .map(|call| command_line(&call.cmd, &call.args))
            .collect();
        assert!(
            remaining.is_empty(),
            "expected no further command invocations, still waiting for {remaining:?}"
        );
    }

    fn next_call(&self, cmd: &str, args: &[&str]) -> Result<ExpectedCall> {
        let received = command_line(cmd, args);
        self.invocations.borrow_mut().push(received.clone());

        let call = self
            .expected
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| InstallerError::StubMismatch {
                message: format!("unexpected command invocation: {received}"),
            })?;

        if call.cmd != cmd || call.args != args {
            return Err(InstallerError::StubMismatch {
                message: format!(
                    "expected `{}`, received `{received}`",
                    command_line(&call.cmd, &call.args)
                ),
            });
        }

        if call.result.is_ok() {
            for path in &call.creates {
                create_stub_file(path)?;
            }
        }
        Ok(call)
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        self.next_call(cmd, args)?.result
    }

    fn run_with_timeout(
        &self,
        cmd: &str,
        args: &[&str],
        _timeout: Duration,
    ) -> Result<Option<Output>> {
        let call = self.next_call(cmd, args)?;
        if call.timed_out {
            return Ok(None);
        }
        call.result.map(Some)
    }
}

fn command_line<S: AsRef<str>>(cmd: &str, args: &[S]) -> String {
    std::iter::once(cmd)
        .chain(args.iter().map(AsRef::as_ref))
        .collect::<Vec<_>>()
        .join(" ")
}

fn create_stub_file(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, b"#!/bin/sh\n")?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

/// Writes a gzip-compressed source distribution whose files live under
/// `top_dir`, returning the SHA-256 of the archive.
///
/// # Errors
///
/// Returns any I/O error raised while writing the archive.
pub fn write_sdist(archive: &Path, top_dir: &str, files: &[(&str, &[u8])]) -> io::Result<Sha256Digest> {
    let file = std::fs::File::create(archive)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, format!("{top_dir}/{name}"), *contents)?;
    }
    builder.into_inner()?.finish()?;

    let mut reader = std::fs::File::open(archive)?;
    Sha256Digest::of_reader(&mut reader)
}
