//! Package version values and inference from archive URLs.
//!
//! Release archives almost always carry their version in the file name
//! (`v0.5.3.tar.gz`, `openai-1.36.1.tar.gz`), so a descriptor may omit an
//! explicit `version` and let it be read from `source_url`.

use crate::sha256_digest::Sha256Digest;
use serde::{Deserialize, Serialize};
use std::fmt;

const CHECKSUM_VERSION_DIGITS: usize = 12;

const ARCHIVE_EXTENSIONS: &[&str] = &[
    ".tar.gz", ".tgz", ".tar.bz2", ".tbz2", ".tar.xz", ".txz", ".tar", ".zip",
];

/// A package version usable as a directory component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Validate an explicit version string.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the value is empty, does
    /// not start with a digit, or contains characters other than ASCII
    /// alphanumerics, `.`, `-`, `_` and `+`.
    ///
    /// # Examples
    ///
    /// ```
    /// use keg_descriptor::version::Version;
    ///
    /// assert!(Version::parse("0.5.3").is_ok());
    /// assert!(Version::parse("latest").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self, String> {
        let trimmed = value.trim();
        if !trimmed.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(format!("\"{trimmed}\" must start with a digit"));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+')))
        {
            return Err(format!("\"{trimmed}\" contains forbidden character {bad:?}"));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Infer a version from the file name at the end of `url`.
    ///
    /// A leading `v` is accepted both on the whole stem (`v0.5.3`) and on the
    /// component after a hyphen (`gen-commit-v0.5.3`). Returns `None` when no
    /// version-like component can be found.
    ///
    /// # Examples
    ///
    /// ```
    /// use keg_descriptor::version::Version;
    ///
    /// let url = "https://github.com/raghavpillai/gen-commit/archive/refs/tags/v0.5.3.tar.gz";
    /// assert_eq!(Version::infer_from_url(url).map(|v| v.to_string()).as_deref(), Some("0.5.3"));
    /// ```
    #[must_use]
    pub fn infer_from_url(url: &str) -> Option<Self> {
        let stem = archive_stem(url)?;
        if let Some(version) = stem
            .strip_prefix('v')
            .and_then(|rest| Self::parse(rest).ok())
        {
            return Some(version);
        }
        if let Ok(version) = Self::parse(stem) {
            return Some(version);
        }
        stem.match_indices('-')
            .rev()
            .filter_map(|(idx, _)| stem.get(idx + 1..))
            .find_map(|tail| {
                Self::parse(tail.strip_prefix('v').unwrap_or(tail)).ok()
            })
    }

    /// Derive a placeholder version from an archive checksum.
    ///
    /// Used when a descriptor neither declares a version nor has one in its
    /// source file name. The result is stable for a given archive and sorts
    /// below any real release: `0.0.0+<first 12 hex digits>`.
    ///
    /// # Examples
    ///
    /// ```
    /// use keg_descriptor::sha256_digest::Sha256Digest;
    /// use keg_descriptor::version::Version;
    ///
    /// let digest = Sha256Digest::of_bytes(b"");
    /// assert_eq!(Version::from_checksum(&digest).as_str(), "0.0.0+e3b0c44298fc");
    /// ```
    #[must_use]
    pub fn from_checksum(checksum: &Sha256Digest) -> Self {
        let prefix: String = checksum
            .as_str()
            .chars()
            .take(CHECKSUM_VERSION_DIGITS)
            .collect();
        Self(format!("0.0.0+{prefix}"))
    }

    /// Return the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Return the last path segment of `url` without query, fragment, or
/// archive extension.
fn archive_stem(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let file_name = path.trim_end_matches('/').rsplit('/').next()?;
    let stem = ARCHIVE_EXTENSIONS
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
        .unwrap_or(file_name);
    (!stem.is_empty()).then_some(stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::github_tag(
        "https://github.com/raghavpillai/gen-commit/archive/refs/tags/v0.5.3.tar.gz",
        "0.5.3"
    )]
    #[case::sdist(
        "https://files.pythonhosted.org/packages/20/49/df/openai-1.36.1.tar.gz",
        "1.36.1"
    )]
    #[case::hyphenated_name(
        "https://files.pythonhosted.org/packages/source/y/your_package/your-package-0.1.0.tar.gz",
        "0.1.0"
    )]
    #[case::bare_version("https://example.test/downloads/2.0.1.zip", "2.0.1")]
    #[case::query_string("https://example.test/tomli-2.0.1.tar.gz?download=1", "2.0.1")]
    #[case::local_file("file:///tmp/mirror/tiktoken-0.7.0.tgz", "0.7.0")]
    #[case::prefixed_after_hyphen(
        "https://example.test/releases/gen-commit-v0.5.3.tar.gz",
        "0.5.3"
    )]
    fn infers_version_from_archive_name(#[case] url: &str, #[case] expected: &str) {
        let version = Version::infer_from_url(url).expect("version inferred");
        assert_eq!(version.as_str(), expected);
    }

    #[rstest]
    #[case::no_version("https://example.test/archive/main.tar.gz")]
    #[case::branch_archive("https://github.com/raghavpillai/gen-commit/archive/refs/heads/main.tar.gz")]
    #[case::empty("")]
    fn returns_none_without_version(#[case] url: &str) {
        assert_eq!(Version::infer_from_url(url), None);
    }

    #[rstest]
    #[case::slash("1.0/2")]
    #[case::empty("")]
    #[case::word("main")]
    fn rejects_unusable_explicit_versions(#[case] value: &str) {
        assert!(Version::parse(value).is_err());
    }

    #[rstest]
    fn checksum_version_is_a_valid_version() {
        let digest = Sha256Digest::of_bytes(b"gen-commit main");
        let version = Version::from_checksum(&digest);
        assert_eq!(Version::parse(version.as_str()), Ok(version.clone()));
        assert!(digest.as_str().starts_with(version.as_str().trim_start_matches("0.0.0+")));
    }
}
