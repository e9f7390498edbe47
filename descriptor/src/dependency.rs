//! Build and runtime dependencies declared by a descriptor.
//!
//! A dependency is written either as a compact `"name@version"` string
//! (`"python@3.12"`) or as a table with an optional executable override:
//!
//! ```toml
//! build_dependencies = [
//!     "python@3.12",
//!     { name = "git", executable = "git" },
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Serialised dependency as it appears in a descriptor file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawDependency {
    /// Compact `name@version` form.
    Shorthand(String),
    /// Table form.
    Table {
        /// Dependency name.
        name: Option<String>,
        /// Version constraint.
        version: Option<String>,
        /// Executable used to probe the dependency.
        executable: Option<String>,
    },
}

/// A validated build dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BuildDependency {
    name: String,
    version_constraint: Option<String>,
    executable: Option<String>,
}

impl BuildDependency {
    /// Validate a raw dependency.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the name is empty or the
    /// version constraint is present but blank.
    pub fn from_raw(raw: RawDependency) -> Result<Self, String> {
        let (raw_name, version, raw_executable) = match raw {
            RawDependency::Shorthand(text) => match text.split_once('@') {
                Some((head, tail)) => (head.to_owned(), Some(tail.to_owned()), None),
                None => (text, None, None),
            },
            RawDependency::Table {
                name,
                version,
                executable,
            } => (name.unwrap_or_default(), version, executable),
        };

        let name = raw_name.trim();
        if name.is_empty() {
            return Err("name is mandatory and must not be empty".to_owned());
        }
        let version_constraint = match version.as_deref().map(str::trim) {
            Some("") => return Err(format!("version constraint for {name} is empty")),
            other => other.map(str::to_owned),
        };
        let executable = raw_executable
            .map(|exe| exe.trim().to_owned())
            .filter(|exe| !exe.is_empty());

        Ok(Self {
            name: name.to_owned(),
            version_constraint,
            executable,
        })
    }

    /// Dependency name, such as `python`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version constraint, such as `3.12`.
    #[must_use]
    pub fn version_constraint(&self) -> Option<&str> {
        self.version_constraint.as_deref()
    }

    /// Executable used to probe this dependency.
    ///
    /// Versioned dependencies follow the `python@3.12` → `python3.12`
    /// convention unless an explicit executable is declared.
    ///
    /// # Examples
    ///
    /// ```
    /// use keg_descriptor::dependency::{BuildDependency, RawDependency};
    ///
    /// let dep = BuildDependency::from_raw(RawDependency::Shorthand("python@3.12".into()))
    ///     .expect("valid dependency");
    /// assert_eq!(dep.executable(), "python3.12");
    /// ```
    #[must_use]
    pub fn executable(&self) -> String {
        match (&self.executable, &self.version_constraint) {
            (Some(exe), _) => exe.clone(),
            (None, Some(version)) => format!("{}{version}", self.name),
            (None, None) => self.name.clone(),
        }
    }

    /// Return true when this dependency provides the Python interpreter.
    #[must_use]
    pub fn is_python_runtime(&self) -> bool {
        self.name == "python" || self.name.starts_with("python3")
    }

    /// Check the output of `<executable> --version` against the constraint.
    ///
    /// The first whitespace-separated token that starts with a digit is
    /// taken as the reported version. The constraint matches when its
    /// dot-separated components are a prefix of the reported ones, so `3.12`
    /// accepts `3.12.4` but not `3.1` or `3.11.9`.
    ///
    /// # Examples
    ///
    /// ```
    /// use keg_descriptor::dependency::{BuildDependency, RawDependency};
    ///
    /// let dep = BuildDependency::from_raw(RawDependency::Shorthand("python@3.12".into()))
    ///     .expect("valid dependency");
    /// assert!(dep.is_satisfied_by("Python 3.12.4"));
    /// assert!(!dep.is_satisfied_by("Python 3.11.9"));
    /// ```
    #[must_use]
    pub fn is_satisfied_by(&self, version_output: &str) -> bool {
        let Some(constraint) = self.version_constraint.as_deref() else {
            return true;
        };
        let Some(reported) = version_output
            .split_whitespace()
            .find(|token| token.starts_with(|c: char| c.is_ascii_digit()))
        else {
            return false;
        };
        let mut reported_parts = reported.split('.');
        constraint
            .split('.')
            .all(|wanted| reported_parts.next() == Some(wanted))
    }
}

impl fmt::Display for BuildDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version_constraint {
            Some(version) => write!(f, "{}@{version}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
