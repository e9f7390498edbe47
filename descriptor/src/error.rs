//! Error types for descriptor parsing and validation.
//!
//! Each variant names the offending field (using its serialised path, such
//! as `bundled_resources[1].source_checksum`) and the constraint that was
//! violated.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors arising from reading, parsing, or validating a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// A mandatory field is missing or empty, or a field breaks a
    /// structural rule.
    #[error("schema error: `{field}` {reason}")]
    Schema {
        /// Serialised path of the offending field.
        field: String,
        /// Description of the violated rule.
        reason: String,
    },

    /// A checksum is not a 64-character hexadecimal SHA-256 digest.
    #[error("checksum format error: `{field}` {reason}")]
    ChecksumFormat {
        /// Serialised path of the offending field.
        field: String,
        /// Description of the formatting problem.
        reason: String,
    },

    /// The descriptor text is not valid TOML or JSON, or contains
    /// unexpected keys.
    #[error("failed to parse {format} descriptor: {message}")]
    Parse {
        /// The format that was attempted.
        format: &'static str,
        /// Parser diagnostic.
        message: String,
    },

    /// The descriptor file could not be read.
    #[error("failed to read descriptor {path}: {message}")]
    Read {
        /// Path that was read.
        path: Utf8PathBuf,
        /// Description of the I/O failure.
        message: String,
    },
}

impl DescriptorError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::Schema {
            field: field.into(),
            reason: "is mandatory and must not be empty".to_owned(),
        }
    }

    pub(crate) fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using [`DescriptorError`].
pub type Result<T> = std::result::Result<T, DescriptorError>;
