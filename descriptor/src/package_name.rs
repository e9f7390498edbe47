//! Semantic wrapper for package and resource names.
//!
//! Names become directory components under the prefix root and the
//! scratch area, so they must be a single, non-empty path segment.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated package or resource name.
///
/// # Examples
///
/// ```
/// use keg_descriptor::package_name::PackageName;
///
/// let name = PackageName::parse("gen-commit").expect("valid name");
/// assert_eq!(name.as_str(), "gen-commit");
/// assert!(PackageName::parse("../escape").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Validate `value` and wrap it.
    ///
    /// Leading and trailing whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the name is empty, is `.`
    /// or `..`, or contains a path separator or control character.
    pub fn parse(value: &str) -> Result<Self, String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("is mandatory and must not be empty".to_owned());
        }
        if trimmed == "." || trimmed == ".." {
            return Err(format!("\"{trimmed}\" is not a usable name"));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| matches!(c, '/' | '\\') || c.is_control() || c.is_whitespace())
        {
            return Err(format!("contains forbidden character {bad:?}"));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Get the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
