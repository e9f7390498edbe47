//! The package descriptor record.
//!
//! [`RawDescriptor`] mirrors the serialised form field for field, with every
//! value optional so that a missing mandatory field is reported as a schema
//! error naming that field rather than as an opaque deserialisation failure.
//! [`crate::validation::validate`] turns it into a [`PackageDescriptor`].

use crate::dependency::{BuildDependency, RawDependency};
use crate::package_name::PackageName;
use crate::procedure::{InstallProcedure, RawTestProcedure, TestProcedure};
use crate::resource::{RawResource, Resource};
use crate::sha256_digest::Sha256Digest;
use crate::version::Version;
use serde::{Deserialize, Serialize};

/// Executable used when a descriptor declares no Python dependency.
pub const DEFAULT_PYTHON: &str = "python3";

/// Serialised descriptor as read from TOML or JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDescriptor {
    /// Package identifier.
    #[serde(default)]
    pub name: Option<String>,
    /// Free-text summary.
    #[serde(default)]
    pub description: Option<String>,
    /// Project homepage.
    #[serde(default)]
    pub homepage_url: Option<String>,
    /// URL of the source archive.
    #[serde(default)]
    pub source_url: Option<String>,
    /// Declared SHA-256 of the source archive.
    #[serde(default)]
    pub source_checksum: Option<String>,
    /// Short licence identifier.
    #[serde(default)]
    pub license: Option<String>,
    /// Explicit version; inferred from `source_url` when absent.
    #[serde(default)]
    pub version: Option<String>,
    /// Build and runtime dependencies.
    #[serde(default)]
    pub build_dependencies: Vec<RawDependency>,
    /// Pinned resources vendored into the environment.
    #[serde(default)]
    pub bundled_resources: Vec<RawResource>,
    /// Install routine reference.
    #[serde(default)]
    pub install_procedure: Option<InstallProcedure>,
    /// Post-install smoke test.
    #[serde(default)]
    pub test_procedure: Option<RawTestProcedure>,
    /// Console scripts to expose on the binary path.
    #[serde(default)]
    pub executables: Vec<String>,
}

/// A validated, immutable package descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDescriptor {
    pub(crate) name: PackageName,
    pub(crate) description: String,
    pub(crate) homepage_url: Option<String>,
    pub(crate) source: Resource,
    pub(crate) license: Option<String>,
    pub(crate) version: Version,
    pub(crate) build_dependencies: Vec<BuildDependency>,
    pub(crate) bundled_resources: Vec<Resource>,
    pub(crate) install_procedure: InstallProcedure,
    pub(crate) test_procedure: Option<TestProcedure>,
    pub(crate) executables: Vec<String>,
}

impl PackageDescriptor {
    /// Package identifier.
    #[must_use]
    pub const fn name(&self) -> &PackageName {
        &self.name
    }

    /// Free-text summary, empty when not declared.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Project homepage.
    #[must_use]
    pub fn homepage_url(&self) -> Option<&str> {
        self.homepage_url.as_deref()
    }

    /// The primary source archive, named after the package.
    #[must_use]
    pub const fn source(&self) -> &Resource {
        &self.source
    }

    /// URL of the source archive.
    #[must_use]
    pub fn source_url(&self) -> &str {
        self.source.source_url()
    }

    /// Declared SHA-256 of the source archive.
    #[must_use]
    pub const fn source_checksum(&self) -> &Sha256Digest {
        self.source.source_checksum()
    }

    /// Short licence identifier.
    #[must_use]
    pub fn license(&self) -> Option<&str> {
        self.license.as_deref()
    }

    /// Explicit, inferred, or checksum-derived version.
    #[must_use]
    pub const fn version(&self) -> &Version {
        &self.version
    }

    /// Declared build dependencies.
    #[must_use]
    pub fn build_dependencies(&self) -> &[BuildDependency] {
        &self.build_dependencies
    }

    /// Bundled resources in declaration order.
    #[must_use]
    pub fn bundled_resources(&self) -> &[Resource] {
        &self.bundled_resources
    }

    /// Bundled resources in processing order.
    ///
    /// Resources are processed by ascending name so that declaration order
    /// never changes what gets fetched or installed, or in which sequence.
    ///
    /// # Examples
    ///
    /// ```
    /// use keg_descriptor::parser::{DescriptorFormat, parse_and_validate};
    ///
    /// let digest = "a".repeat(64);
    /// let text = format!(r#"
    /// name = "demo"
    /// source_url = "https://example.test/demo-1.0.tar.gz"
    /// source_checksum = "{digest}"
    ///
    /// [[bundled_resources]]
    /// name = "tomli"
    /// source_url = "https://example.test/tomli-2.0.1.tar.gz"
    /// source_checksum = "{digest}"
    ///
    /// [[bundled_resources]]
    /// name = "anthropic"
    /// source_url = "https://example.test/anthropic-0.2.8.tar.gz"
    /// source_checksum = "{digest}"
    /// "#);
    /// let descriptor = parse_and_validate(&text, DescriptorFormat::Toml).expect("valid");
    /// let names: Vec<_> = descriptor
    ///     .resources_in_install_order()
    ///     .iter()
    ///     .map(|r| r.name().as_str())
    ///     .collect();
    /// assert_eq!(names, ["anthropic", "tomli"]);
    /// ```
    #[must_use]
    pub fn resources_in_install_order(&self) -> Vec<&Resource> {
        let mut ordered: Vec<&Resource> = self.bundled_resources.iter().collect();
        ordered.sort_by(|a, b| a.name().cmp(b.name()));
        ordered
    }

    /// Install routine reference.
    #[must_use]
    pub const fn install_procedure(&self) -> InstallProcedure {
        self.install_procedure
    }

    /// Post-install smoke test, if declared.
    #[must_use]
    pub const fn test_procedure(&self) -> Option<&TestProcedure> {
        self.test_procedure.as_ref()
    }

    /// Console scripts to expose on the binary path.
    ///
    /// Falls back to the smoke-test command when none are declared.
    #[must_use]
    pub fn executables(&self) -> Vec<&str> {
        if self.executables.is_empty() {
            return self
                .test_procedure
                .iter()
                .map(TestProcedure::command)
                .collect();
        }
        self.executables.iter().map(String::as_str).collect()
    }

    /// The dependency that supplies the Python interpreter, if declared.
    #[must_use]
    pub fn runtime(&self) -> Option<&BuildDependency> {
        self.build_dependencies
            .iter()
            .find(|dep| dep.is_python_runtime())
    }

    /// Interpreter executable used to create the virtualenv.
    #[must_use]
    pub fn runtime_executable(&self) -> String {
        self.runtime()
            .map_or_else(|| DEFAULT_PYTHON.to_owned(), BuildDependency::executable)
    }
}
