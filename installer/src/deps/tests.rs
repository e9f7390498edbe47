//! Tests for build dependency checks.

use super::*;
use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, stdout_output};
use keg_descriptor::dependency::RawDependency;
use rstest::rstest;
use std::io;

fn dependency(text: &str) -> BuildDependency {
    BuildDependency::from_raw(RawDependency::Shorthand(text.to_owned())).expect("valid dependency")
}

#[rstest]
#[case::exact_minor("Python 3.12.4\n")]
#[case::bare_version("3.12.0")]
fn accepts_matching_version(#[case] reported: &str) {
    let executor = StubExecutor::new(vec![ExpectedCall::new(
        "python3.12",
        ["--version"],
        Ok(stdout_output(reported)),
    )]);

    check_build_dependencies(&executor, &[dependency("python@3.12")]).expect("satisfied");
    executor.assert_finished();
}

#[rstest]
#[case::older_minor("Python 3.11.9")]
#[case::shorter("Python 3.1")]
#[case::no_version("Python")]
fn rejects_mismatched_version(#[case] reported: &str) {
    let executor = StubExecutor::new(vec![ExpectedCall::new(
        "python3.12",
        ["--version"],
        Ok(stdout_output(reported)),
    )]);

    let err = check_build_dependencies(&executor, &[dependency("python@3.12")])
        .expect_err("version mismatch");
    assert!(matches!(
        err,
        InstallerError::Dependency { ref dependency, .. } if dependency == "python@3.12"
    ));
}

#[test]
fn reads_version_from_stderr_when_stdout_is_empty() {
    let output = Output {
        stderr: b"Python 3.12.1\n".to_vec(),
        ..stdout_output("")
    };
    let executor = StubExecutor::new(vec![ExpectedCall::new(
        "python3.12",
        ["--version"],
        Ok(output),
    )]);

    check_build_dependencies(&executor, &[dependency("python@3.12")]).expect("satisfied");
}

#[test]
fn missing_executable_is_dependency_error() {
    let executor = StubExecutor::new(vec![ExpectedCall::new(
        "python3.12",
        ["--version"],
        Err(InstallerError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            "No such file or directory",
        ))),
    )]);

    let err = check_build_dependencies(&executor, &[dependency("python@3.12")])
        .expect_err("missing interpreter");
    let msg = err.to_string();
    assert!(msg.contains("python@3.12"));
    assert!(msg.contains("could not run"));
}

#[test]
fn failing_executable_is_dependency_error() {
    let executor = StubExecutor::new(vec![ExpectedCall::new(
        "git",
        ["--version"],
        Ok(failure_output("broken install")),
    )]);

    let err = check_build_dependencies(&executor, &[dependency("git")]).expect_err("failure");
    assert!(err.to_string().contains("broken install"));
}

#[test]
fn unconstrained_dependency_only_needs_to_run() {
    let executor = StubExecutor::new(vec![ExpectedCall::new(
        "git",
        ["--version"],
        Ok(stdout_output("git version 2.45.0")),
    )]);

    check_build_dependencies(&executor, &[dependency("git")]).expect("satisfied");
    executor.assert_finished();
}

#[test]
fn stops_at_first_unsatisfied_dependency() {
    let executor = StubExecutor::new(vec![ExpectedCall::new(
        "python3.12",
        ["--version"],
        Ok(stdout_output("Python 3.10.2")),
    )]);

    let deps = [dependency("python@3.12"), dependency("git")];
    assert!(check_build_dependencies(&executor, &deps).is_err());
    executor.assert_finished();
}

#[cfg(unix)]
#[test]
fn system_executor_times_out_long_running_commands() {
    let outcome = SystemCommandExecutor
        .run_with_timeout("sleep", &["5"], Duration::from_millis(100))
        .expect("spawn sleep");
    assert!(outcome.is_none());
}

#[cfg(unix)]
#[test]
fn system_executor_captures_output_within_timeout() {
    let outcome = SystemCommandExecutor
        .run_with_timeout("echo", &["keg"], Duration::from_secs(5))
        .expect("spawn echo")
        .expect("completes in time");
    assert!(outcome.status.success());
    assert_eq!(String::from_utf8_lossy(&outcome.stdout).trim(), "keg");
}

#[cfg(unix)]
#[test]
fn system_executor_drains_output_larger_than_a_pipe_buffer() {
    let outcome = SystemCommandExecutor
        .run_with_timeout(
            "sh",
            &["-c", "head -c 200000 /dev/zero; head -c 100000 /dev/zero >&2"],
            Duration::from_secs(10),
        )
        .expect("spawn sh")
        .expect("completes in time");
    assert!(outcome.status.success());
    assert_eq!(outcome.stdout.len(), 200_000);
    assert_eq!(outcome.stderr.len(), 100_000);
}

#[cfg(unix)]
#[test]
fn system_executor_keeps_non_utf8_output() {
    let outcome = SystemCommandExecutor
        .run_with_timeout(
            "printf",
            &["gencommit 0.5.3 \\377\\n"],
            Duration::from_secs(5),
        )
        .expect("spawn printf")
        .expect("completes in time");
    assert!(outcome.status.success());
    assert!(outcome.stdout.contains(&0xff));
    assert!(String::from_utf8_lossy(&outcome.stdout).contains("gencommit 0.5.3"));
}
