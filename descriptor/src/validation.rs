//! Descriptor validation.
//!
//! Validation is pure: it never touches the network or the filesystem, so a
//! malformed descriptor is rejected before any fetch happens. Presence of the
//! mandatory fields is checked before their format, which means a descriptor
//! missing `source_url` always reports a schema error even if its checksum is
//! also malformed.

use crate::dependency::BuildDependency;
use crate::descriptor::{PackageDescriptor, RawDescriptor};
use crate::error::{DescriptorError, Result};
use crate::package_name::PackageName;
use crate::procedure::TestProcedure;
use crate::resource::{RawResource, Resource};
use crate::sha256_digest::Sha256Digest;
use crate::version::Version;
use log::debug;
use std::collections::BTreeSet;

/// Validate a raw descriptor into a [`PackageDescriptor`].
///
/// # Errors
///
/// Returns [`DescriptorError::Schema`] when a mandatory field is missing or
/// empty, a resource name is repeated or equals the package name, or a field is structurally unusable
/// (for example a test command containing a path). Returns
/// [`DescriptorError::ChecksumFormat`] when any checksum is not a
/// 64-character hex digest.
pub fn validate(raw: RawDescriptor) -> Result<PackageDescriptor> {
    let name_text = require(raw.name.as_deref(), "name")?;
    let source_url = require(raw.source_url.as_deref(), "source_url")?;
    let checksum_text = require(raw.source_checksum.as_deref(), "source_checksum")?;
    require_resource_fields(&raw.bundled_resources)?;

    let name =
        PackageName::parse(name_text).map_err(|reason| DescriptorError::schema("name", reason))?;
    let source_checksum = parse_checksum(checksum_text, "source_checksum")?;
    let bundled_resources = validate_resources(raw.bundled_resources, &name)?;
    let version = resolve_version(raw.version.as_deref(), source_url, &source_checksum)?;

    let build_dependencies = raw
        .build_dependencies
        .into_iter()
        .enumerate()
        .map(|(idx, dep)| {
            BuildDependency::from_raw(dep).map_err(|reason| {
                DescriptorError::schema(format!("build_dependencies[{idx}]"), reason)
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let test_procedure = raw
        .test_procedure
        .map(|test| {
            TestProcedure::from_raw(test)
                .map_err(|reason| DescriptorError::schema("test_procedure.command", reason))
        })
        .transpose()?;

    let executables = raw
        .executables
        .iter()
        .enumerate()
        .map(|(idx, exe)| {
            PackageName::parse(exe)
                .map(PackageName::into_inner)
                .map_err(|reason| DescriptorError::schema(format!("executables[{idx}]"), reason))
        })
        .collect::<Result<Vec<_>>>()?;

    let source = Resource::new(name.clone(), source_url, source_checksum);
    debug!(
        "validated descriptor {name} {version} with {} resource(s)",
        bundled_resources.len()
    );

    Ok(PackageDescriptor {
        name,
        description: raw.description.unwrap_or_default(),
        homepage_url: non_blank(raw.homepage_url),
        source,
        license: non_blank(raw.license),
        version,
        build_dependencies,
        bundled_resources,
        install_procedure: raw.install_procedure.unwrap_or_default(),
        test_procedure,
        executables,
    })
}

fn require<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(DescriptorError::missing(field)),
    }
}

fn parse_checksum(value: &str, field: &str) -> Result<Sha256Digest> {
    Sha256Digest::try_from(value).map_err(|err| DescriptorError::ChecksumFormat {
        field: field.to_owned(),
        reason: err.reason,
    })
}

fn require_resource_fields(raw: &[RawResource]) -> Result<()> {
    for (idx, resource) in raw.iter().enumerate() {
        require(resource.name.as_deref(), &format!("bundled_resources[{idx}].name"))?;
        require(
            resource.source_url.as_deref(),
            &format!("bundled_resources[{idx}].source_url"),
        )?;
        require(
            resource.source_checksum.as_deref(),
            &format!("bundled_resources[{idx}].source_checksum"),
        )?;
    }
    Ok(())
}

fn validate_resources(raw: Vec<RawResource>, package: &PackageName) -> Result<Vec<Resource>> {
    let mut seen = BTreeSet::new();
    let mut resources = Vec::with_capacity(raw.len());
    for (idx, resource) in raw.into_iter().enumerate() {
        let field = |leaf: &str| format!("bundled_resources[{idx}].{leaf}");
        let name_text = resource.name.as_deref().unwrap_or_default();
        let name = PackageName::parse(name_text)
            .map_err(|reason| DescriptorError::schema(field("name"), reason))?;
        // Resources and the package share the scratch namespace.
        if name == *package {
            return Err(DescriptorError::schema(
                field("name"),
                format!("duplicates the package name \"{package}\""),
            ));
        }
        if !seen.insert(name.clone()) {
            return Err(DescriptorError::schema(
                field("name"),
                format!("duplicates resource \"{name}\""),
            ));
        }
        let url = resource.source_url.as_deref().unwrap_or_default().trim();
        let checksum = parse_checksum(
            resource.source_checksum.as_deref().unwrap_or_default().trim(),
            &field("source_checksum"),
        )?;
        resources.push(Resource::new(name, url, checksum));
    }
    Ok(resources)
}

/// Pick the explicit version, else one read from the archive name, else a
/// placeholder derived from the source checksum.
fn resolve_version(
    explicit: Option<&str>,
    source_url: &str,
    source_checksum: &Sha256Digest,
) -> Result<Version> {
    match explicit.map(str::trim).filter(|text| !text.is_empty()) {
        Some(text) => Version::parse(text).map_err(|reason| DescriptorError::schema("version", reason)),
        None => Ok(Version::infer_from_url(source_url).unwrap_or_else(|| {
            let fallback = Version::from_checksum(source_checksum);
            debug!("no version in {source_url}; using {fallback}");
            fallback
        })),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
