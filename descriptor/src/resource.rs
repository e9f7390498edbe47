//! Bundled resources: pinned, checksum-verified dependencies vendored into
//! the isolated environment.

use crate::package_name::PackageName;
use crate::sha256_digest::Sha256Digest;
use serde::{Deserialize, Serialize};

/// Serialised resource as it appears in a descriptor file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawResource {
    /// Resource name.
    #[serde(default)]
    pub name: Option<String>,
    /// URL of the resource archive.
    #[serde(default)]
    pub source_url: Option<String>,
    /// Declared SHA-256 of the resource archive.
    #[serde(default)]
    pub source_checksum: Option<String>,
}

/// A validated bundled resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Resource {
    name: PackageName,
    source_url: String,
    source_checksum: Sha256Digest,
}

impl Resource {
    /// Assemble a resource from already-validated parts.
    #[must_use]
    pub fn new(name: PackageName, source_url: impl Into<String>, source_checksum: Sha256Digest) -> Self {
        Self {
            name,
            source_url: source_url.into(),
            source_checksum,
        }
    }

    /// Resource name.
    #[must_use]
    pub const fn name(&self) -> &PackageName {
        &self.name
    }

    /// URL of the resource archive.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Declared SHA-256 of the resource archive.
    #[must_use]
    pub const fn source_checksum(&self) -> &Sha256Digest {
        &self.source_checksum
    }
}
