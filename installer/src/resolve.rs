//! Download and verification of a descriptor's artefacts.
//!
//! Resolution fetches the primary source archive and every bundled resource
//! into the download cache and checks each against its declared SHA-256.
//! Artefacts are cached as `<cache_dir>/downloads/<sha256>--<file name>`, so
//! a verified file is reused on the next run without touching the network.
//! Downloads land in a temporary file beside the cache entry and are only
//! moved into place once their digest matches.

use crate::error::{InstallerError, Result};
use crate::fetch::download::SourceDownloader;
use crate::output::write_stderr_line;
use camino::{Utf8Path, Utf8PathBuf};
use keg_descriptor::{PackageDescriptor, Resource, Sha256Digest};
use log::{debug, warn};
use std::io::Write;

/// Subdirectory of the cache directory holding downloaded artefacts.
pub const DOWNLOADS_DIR: &str = "downloads";

const FALLBACK_FILE_NAME: &str = "archive.tar.gz";

/// Settings for a resolution run.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Root of the download cache.
    pub cache_dir: Utf8PathBuf,
    /// Extra attempts made when a download fails. Integrity failures are
    /// never retried.
    pub retries: u32,
    /// When true, suppress progress output.
    pub quiet: bool,
}

/// A verified artefact in the download cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtefact {
    /// Package or resource name.
    pub name: String,
    /// URL the artefact was declared at.
    pub url: String,
    /// Verified SHA-256 digest.
    pub checksum: Sha256Digest,
    /// Location of the artefact in the cache.
    pub path: Utf8PathBuf,
    /// True when the artefact was already cached and no download happened.
    pub from_cache: bool,
}

/// Every artefact needed to install one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSources {
    /// The primary source archive.
    pub source: ResolvedArtefact,
    /// Bundled resources in install order.
    pub resources: Vec<ResolvedArtefact>,
}

impl ResolvedSources {
    /// Number of artefacts that had to be downloaded.
    #[must_use]
    pub fn downloaded_count(&self) -> usize {
        std::iter::once(&self.source)
            .chain(&self.resources)
            .filter(|artefact| !artefact.from_cache)
            .count()
    }
}

/// Fetch and verify the source archive and every bundled resource.
///
/// The primary source is resolved first, then resources in install order.
/// The first failure stops resolution.
///
/// # Errors
///
/// Returns [`InstallerError::Fetch`] when a download fails after all
/// retries, [`InstallerError::Integrity`] when a download does not hash to
/// its declared checksum, or [`InstallerError::Io`] when the cache cannot
/// be written.
pub fn resolve(
    descriptor: &PackageDescriptor,
    downloader: &dyn SourceDownloader,
    options: &ResolveOptions,
    stderr: &mut dyn Write,
) -> Result<ResolvedSources> {
    let source = resolve_artefact(descriptor.source(), downloader, options, stderr)?;
    let resources = descriptor
        .resources_in_install_order()
        .into_iter()
        .map(|resource| resolve_artefact(resource, downloader, options, stderr))
        .collect::<Result<Vec<_>>>()?;
    Ok(ResolvedSources { source, resources })
}

/// Fetch and verify a single artefact, reusing a verified cache entry.
///
/// # Errors
///
/// See [`resolve`].
pub fn resolve_artefact(
    resource: &Resource,
    downloader: &dyn SourceDownloader,
    options: &ResolveOptions,
    stderr: &mut dyn Write,
) -> Result<ResolvedArtefact> {
    let name = resource.name().as_str();
    let url = resource.source_url();
    let expected = resource.source_checksum();
    let path = cache_path(&options.cache_dir, resource);
    let resolved = |from_cache| ResolvedArtefact {
        name: name.to_owned(),
        url: url.to_owned(),
        checksum: expected.clone(),
        path: path.clone(),
        from_cache,
    };

    if reuse_cached(&path, expected)? {
        debug!("cache hit for {name}: {path}");
        if !options.quiet {
            write_stderr_line(stderr, format!("Using cached {name}"));
        }
        return Ok(resolved(true));
    }

    if !options.quiet {
        write_stderr_line(stderr, format!("Fetching {name} from {url}..."));
    }
    let downloads = options.cache_dir.join(DOWNLOADS_DIR);
    std::fs::create_dir_all(&downloads)?;
    let partial = download_with_retries(resource, downloader, &downloads, options.retries)?;

    let actual = digest_of(partial.path())?;
    if &actual != expected {
        // Dropping `partial` removes the corrupt download.
        return Err(InstallerError::Integrity {
            name: name.to_owned(),
            url: url.to_owned(),
            expected: expected.clone(),
            actual,
        });
    }

    partial
        .persist(path.as_std_path())
        .map_err(|err| InstallerError::Io(err.error))?;
    debug!("cached {name} at {path}");
    Ok(resolved(false))
}

/// Cache location for an artefact: `<cache_dir>/downloads/<sha256>--<file>`.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use keg_descriptor::{Resource, Sha256Digest};
/// use keg_descriptor::package_name::PackageName;
/// use keg_installer::resolve::cache_path;
///
/// let digest = Sha256Digest::try_from("a".repeat(64)).expect("valid digest");
/// let name = PackageName::parse("tomli").expect("valid name");
/// let resource = Resource::new(name, "https://example.test/tomli-2.0.1.tar.gz", digest);
/// let path = cache_path(Utf8Path::new("/cache"), &resource);
/// assert_eq!(path.file_name(), Some(format!("{}--tomli-2.0.1.tar.gz", "a".repeat(64)).as_str()));
/// ```
#[must_use]
pub fn cache_path(cache_dir: &Utf8Path, resource: &Resource) -> Utf8PathBuf {
    cache_dir.join(DOWNLOADS_DIR).join(format!(
        "{}--{}",
        resource.source_checksum(),
        url_file_name(resource.source_url())
    ))
}

fn url_file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name,
        _ => FALLBACK_FILE_NAME,
    }
}

/// Returns true when a cache entry exists and matches `expected`. A stale
/// entry is removed.
fn reuse_cached(path: &Utf8Path, expected: &Sha256Digest) -> Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    let actual = digest_of(path.as_std_path())?;
    if &actual == expected {
        return Ok(true);
    }
    warn!("discarding cached {path}: sha256 {actual} does not match {expected}");
    std::fs::remove_file(path)?;
    Ok(false)
}

fn download_with_retries(
    resource: &Resource,
    downloader: &dyn SourceDownloader,
    downloads: &Utf8Path,
    retries: u32,
) -> Result<tempfile::NamedTempFile> {
    let url = resource.source_url();
    let mut attempt = 0;
    loop {
        let partial = tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(downloads)?;
        match downloader.download(url, partial.path()) {
            Ok(()) => return Ok(partial),
            Err(err) if attempt < retries => {
                attempt += 1;
                warn!("download of {url} failed ({err}); retry {attempt} of {retries}");
            }
            Err(source) => {
                return Err(InstallerError::Fetch {
                    name: resource.name().to_string(),
                    url: url.to_owned(),
                    source,
                });
            }
        }
    }
}

fn digest_of(path: &std::path::Path) -> Result<Sha256Digest> {
    let mut file = std::fs::File::open(path)?;
    Ok(Sha256Digest::of_reader(&mut file)?)
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
