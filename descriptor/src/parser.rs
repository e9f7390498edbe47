//! Descriptor parsing from TOML or JSON text.

use crate::descriptor::{PackageDescriptor, RawDescriptor};
use crate::error::{DescriptorError, Result};
use crate::validation::validate;
use camino::Utf8Path;
use log::trace;

/// Serialisation formats a descriptor may be written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DescriptorFormat {
    /// TOML, the default for descriptor files.
    #[default]
    Toml,
    /// JSON.
    Json,
}

impl DescriptorFormat {
    /// Choose a format from a file extension, falling back to TOML.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use keg_descriptor::parser::DescriptorFormat;
    ///
    /// assert_eq!(
    ///     DescriptorFormat::from_path(Utf8Path::new("formulae/gen-commit.json")),
    ///     DescriptorFormat::Json
    /// );
    /// assert_eq!(
    ///     DescriptorFormat::from_path(Utf8Path::new("formulae/gen-commit")),
    ///     DescriptorFormat::Toml
    /// );
    /// ```
    #[must_use]
    pub fn from_path(path: &Utf8Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }

    /// Lower-case format name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

/// Deserialise descriptor text without validating it.
///
/// # Errors
///
/// Returns [`DescriptorError::Parse`] when the text is not well-formed or
/// contains keys the descriptor does not define.
pub fn parse_descriptor(text: &str, format: DescriptorFormat) -> Result<RawDescriptor> {
    let parse_error = |message: String| DescriptorError::Parse {
        format: format.name(),
        message,
    };
    match format {
        DescriptorFormat::Toml => toml::from_str(text).map_err(|err| parse_error(err.to_string())),
        DescriptorFormat::Json => {
            serde_json::from_str(text).map_err(|err| parse_error(err.to_string()))
        }
    }
}

/// Parse and validate descriptor text in one step.
///
/// # Errors
///
/// Returns a parse error for malformed text, otherwise any validation error
/// reported by [`crate::validation::validate`].
pub fn parse_and_validate(text: &str, format: DescriptorFormat) -> Result<PackageDescriptor> {
    parse_descriptor(text, format).and_then(validate)
}

/// Read, parse, and validate a descriptor file.
///
/// # Errors
///
/// Returns [`DescriptorError::Read`] when the file cannot be read, otherwise
/// the errors of [`parse_and_validate`].
pub fn load_descriptor(path: &Utf8Path) -> Result<PackageDescriptor> {
    trace!("loading descriptor from {path}");
    let text = std::fs::read_to_string(path).map_err(|err| DescriptorError::Read {
        path: path.to_owned(),
        message: err.to_string(),
    })?;
    parse_and_validate(&text, DescriptorFormat::from_path(path))
}
