//! Resource generation from a pinned `requirements.txt`.
//!
//! Each `name==version` pin is looked up in the PyPI JSON API and the first
//! `.tar.gz` source distribution is turned into a `[[bundled_resources]]`
//! entry ready to paste into a descriptor. Problems with individual pins are
//! collected as warnings so one bad line does not lose the rest.

use crate::fetch::download::SourceDownloader;
use keg_descriptor::Sha256Digest;
use log::debug;
use serde::{Deserialize, Serialize};

/// Base URL of the PyPI JSON API.
pub const PYPI_BASE_URL: &str = "https://pypi.org/pypi";

const SDIST_SUFFIX: &str = ".tar.gz";

/// A pinned requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    /// Distribution name.
    pub name: String,
    /// Exact version.
    pub version: String,
}

/// How a requirements line was interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementLine {
    /// Blank, comment, or editable install; ignored silently.
    Skipped,
    /// A usable `name==version` pin.
    Pinned(Pin),
    /// Anything else.
    Invalid(String),
}

/// Interpret one line of a requirements file.
///
/// # Examples
///
/// ```
/// use keg_installer::requirements::{RequirementLine, parse_requirement_line};
///
/// assert_eq!(parse_requirement_line("# pinned"), RequirementLine::Skipped);
/// assert!(matches!(parse_requirement_line("tomli==2.0.1"), RequirementLine::Pinned(_)));
/// assert!(matches!(parse_requirement_line("tomli>=2"), RequirementLine::Invalid(_)));
/// ```
#[must_use]
pub fn parse_requirement_line(line: &str) -> RequirementLine {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("-e") {
        return RequirementLine::Skipped;
    }

    let mut parts = trimmed.split("==");
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(version), None) if !name.trim().is_empty() && !version.trim().is_empty() => {
            RequirementLine::Pinned(Pin {
                name: name.trim().to_owned(),
                version: version.trim().to_owned(),
            })
        }
        _ => RequirementLine::Invalid(trimmed.to_owned()),
    }
}

/// PyPI JSON metadata URL for a pin.
#[must_use]
pub fn pypi_metadata_url(pin: &Pin) -> String {
    format!("{PYPI_BASE_URL}/{}/{}/json", pin.name, pin.version)
}

/// The subset of the PyPI release document keg needs.
#[derive(Debug, Deserialize)]
struct PypiRelease {
    urls: Vec<PypiFile>,
}

#[derive(Debug, Deserialize)]
struct PypiFile {
    url: String,
    digests: PypiDigests,
}

#[derive(Debug, Deserialize)]
struct PypiDigests {
    sha256: String,
}

/// A generated bundled resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedResource {
    /// Resource name.
    pub name: String,
    /// URL of the source distribution.
    pub source_url: String,
    /// SHA-256 published by PyPI.
    pub source_checksum: Sha256Digest,
}

/// Resources generated from a requirements file, plus skipped pins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedResources {
    /// Resources in requirements-file order.
    pub resources: Vec<GeneratedResource>,
    /// One message per line that could not be turned into a resource.
    pub warnings: Vec<String>,
}

/// Generate resources for every pin in `requirements`.
pub fn generate_resources(
    requirements: &str,
    downloader: &dyn SourceDownloader,
) -> GeneratedResources {
    let mut generated = GeneratedResources::default();

    for line in requirements.lines() {
        match parse_requirement_line(line) {
            RequirementLine::Skipped => {}
            RequirementLine::Invalid(text) => {
                generated.warnings.push(format!("Skipping invalid line: {text}"));
            }
            RequirementLine::Pinned(pin) => match resolve_pin(&pin, downloader) {
                Ok(resource) => generated.resources.push(resource),
                Err(reason) => generated.warnings.push(reason),
            },
        }
    }

    generated
}

fn resolve_pin(
    pin: &Pin,
    downloader: &dyn SourceDownloader,
) -> Result<GeneratedResource, String> {
    let url = pypi_metadata_url(pin);
    debug!("looking up {}=={} at {url}", pin.name, pin.version);
    let failed = |reason: String| {
        format!(
            "Failed to fetch package info for {}=={}: {reason}",
            pin.name, pin.version
        )
    };

    let body = downloader
        .download_text(&url)
        .map_err(|err| failed(err.to_string()))?;
    let release: PypiRelease =
        serde_json::from_str(&body).map_err(|err| failed(err.to_string()))?;

    let sdist = release
        .urls
        .into_iter()
        .find(|file| file.url.ends_with(SDIST_SUFFIX))
        .ok_or_else(|| {
            format!(
                "No {SDIST_SUFFIX} distribution found for {}=={}",
                pin.name, pin.version
            )
        })?;
    let checksum =
        Sha256Digest::try_from(sdist.digests.sha256).map_err(|err| failed(err.to_string()))?;

    Ok(GeneratedResource {
        name: pin.name.clone(),
        source_url: sdist.url,
        source_checksum: checksum,
    })
}

#[derive(Serialize)]
struct ResourcesDocument<'a> {
    bundled_resources: &'a [GeneratedResource],
}

/// Render resources as `[[bundled_resources]]` TOML blocks.
///
/// # Errors
///
/// Returns the serializer error if the resources cannot be encoded.
pub fn render_resources_toml(resources: &[GeneratedResource]) -> Result<String, toml::ser::Error> {
    toml::to_string(&ResourcesDocument {
        bundled_resources: resources,
    })
}
