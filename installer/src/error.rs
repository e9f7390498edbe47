//! Error types for the keg installer.
//!
//! This module defines semantic error variants that provide actionable guidance
//! to users when an install fails. Descriptor problems are carried through
//! unchanged from `keg-descriptor`; every later stage has its own variant so
//! callers can tell a network failure from a tampered archive or a broken
//! build.

use crate::fetch::download::DownloadError;
use camino::Utf8PathBuf;
use keg_descriptor::{DescriptorError, Sha256Digest};
use thiserror::Error;

/// Errors that can occur while validating, resolving, installing, or testing
/// a package.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The descriptor could not be read, parsed, or validated.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// An artefact could not be downloaded.
    #[error("failed to fetch {name} from {url}: {source}")]
    Fetch {
        /// Name of the package or resource being fetched.
        name: String,
        /// URL that was requested.
        url: String,
        /// The underlying download failure.
        #[source]
        source: DownloadError,
    },

    /// A downloaded artefact does not hash to its declared checksum.
    #[error("integrity check failed for {name} ({url}): expected sha256 {expected}, got {actual}")]
    Integrity {
        /// Name of the package or resource.
        name: String,
        /// URL the artefact was fetched from.
        url: String,
        /// Checksum declared by the descriptor.
        expected: Sha256Digest,
        /// Checksum of the bytes actually received.
        actual: Sha256Digest,
    },

    /// A build dependency is missing or reports the wrong version.
    #[error("build dependency {dependency} is not satisfied: {reason}")]
    Dependency {
        /// The dependency as declared, such as `python@3.12`.
        dependency: String,
        /// Description of the failed check.
        reason: String,
    },

    /// A step of the install procedure failed.
    #[error("install failed while trying to {step}: {reason}")]
    Build {
        /// The step that failed, phrased as an action.
        step: String,
        /// Description of the failure.
        reason: String,
    },

    /// The post-install smoke test failed.
    #[error("smoke test `{command}` failed: {reason}")]
    SmokeTest {
        /// The command line that was run.
        command: String,
        /// Description of the failure.
        reason: String,
    },

    /// The configuration file could not be read or parsed.
    #[error("invalid configuration in {path}: {reason}")]
    Config {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// A platform default directory could not be determined.
    #[error("could not determine the default {what}; set it in config.toml or on the command line")]
    MissingDirectory {
        /// The directory that is missing, such as `prefix root`.
        what: &'static str,
    },

    /// The target prefix already exists.
    #[error("{prefix} already exists; pass --force to reinstall")]
    AlreadyInstalled {
        /// The existing prefix.
        prefix: Utf8PathBuf,
    },

    /// No installation exists at the expected prefix.
    #[error("no installation found at {prefix}")]
    NotInstalled {
        /// The prefix that was checked.
        prefix: Utf8PathBuf,
    },

    /// An input file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadFailed {
        /// Path of the file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to scan the prefix root for installed packages.
    #[error("failed to scan prefix root")]
    ScanFailed {
        /// The underlying error that caused the scan to fail.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl InstallerError {
    pub(crate) fn build(step: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Build {
            step: step.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;
