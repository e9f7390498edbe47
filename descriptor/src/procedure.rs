//! Install and smoke-test procedures referenced by a descriptor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The routine used to install a package.
///
/// Descriptors reference the routine by name; its behaviour lives in the
/// installer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallProcedure {
    /// Create a virtualenv, install every bundled resource into it without
    /// dependency resolution, then install the package itself.
    #[default]
    VirtualenvWithResources,
}

impl fmt::Display for InstallProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VirtualenvWithResources => write!(f, "virtualenv-with-resources"),
        }
    }
}

/// Serialised smoke-test procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTestProcedure {
    /// Executable name, relative to the prefix `bin` directory.
    #[serde(default)]
    pub command: Option<String>,
    /// Arguments passed to the executable.
    #[serde(default)]
    pub args: Vec<String>,
    /// Exit code regarded as success.
    #[serde(default)]
    pub expected_exit_code: Option<i32>,
    /// Substring that must appear in stdout or stderr.
    #[serde(default)]
    pub expected_output: Option<String>,
}

/// A minimal post-install check, typically `<exe> --version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestProcedure {
    command: String,
    args: Vec<String>,
    expected_exit_code: i32,
    expected_output: Option<String>,
}

impl TestProcedure {
    /// Validate a raw procedure.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the command is missing,
    /// empty, or contains a path separator.
    pub fn from_raw(raw: RawTestProcedure) -> Result<Self, String> {
        let command = raw.command.as_deref().map(str::trim).unwrap_or_default();
        if command.is_empty() {
            return Err("is mandatory and must not be empty".to_owned());
        }
        if command.contains(['/', '\\']) {
            return Err(format!(
                "\"{command}\" must be a bare executable name, not a path"
            ));
        }
        Ok(Self {
            command: command.to_owned(),
            args: raw.args,
            expected_exit_code: raw.expected_exit_code.unwrap_or(0),
            expected_output: raw.expected_output.filter(|text| !text.is_empty()),
        })
    }

    /// Executable name.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Arguments passed to the executable.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Exit code regarded as success.
    #[must_use]
    pub const fn expected_exit_code(&self) -> i32 {
        self.expected_exit_code
    }

    /// Substring required in the command output, if any.
    #[must_use]
    pub fn expected_output(&self) -> Option<&str> {
        self.expected_output.as_deref()
    }
}

impl fmt::Display for TestProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_procedure_round_trips_by_name() {
        let parsed: InstallProcedure =
            serde_json::from_str("\"virtualenv-with-resources\"").expect("known procedure");
        assert_eq!(parsed, InstallProcedure::VirtualenvWithResources);
        assert!(serde_json::from_str::<InstallProcedure>("\"make-install\"").is_err());
    }

    #[test]
    fn defaults_expected_exit_code_to_zero() {
        let raw = RawTestProcedure {
            command: Some("autocommit".to_owned()),
            args: vec!["--version".to_owned()],
            ..RawTestProcedure::default()
        };
        let test = TestProcedure::from_raw(raw).expect("valid procedure");
        assert_eq!(test.expected_exit_code(), 0);
        assert_eq!(test.args(), ["--version"]);
        assert_eq!(test.expected_output(), None);
        assert_eq!(test.to_string(), "autocommit --version");
    }

    #[test]
    fn rejects_missing_command() {
        let err = TestProcedure::from_raw(RawTestProcedure::default()).expect_err("no command");
        assert!(err.contains("mandatory"));
    }

    #[test]
    fn rejects_command_paths() {
        let raw = RawTestProcedure {
            command: Some("../bin/gencommit".to_owned()),
            ..RawTestProcedure::default()
        };
        assert!(TestProcedure::from_raw(raw).is_err());
    }
}
