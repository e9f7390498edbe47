//! Artefact download logic.
//!
//! Provides a trait-based abstraction for fetching source archives and
//! metadata documents, enabling dependency injection for testing. Remote
//! URLs are fetched with `ureq`; `file://` URLs are read from disk, which
//! serves local mirrors and keeps tests off the network.

use log::trace;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default network timeout for a single download.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

const FILE_SCHEME: &str = "file://";

/// Trait for downloading artefacts by URL.
///
/// # Examples
///
/// ```no_run
/// use keg_installer::fetch::download::{HttpDownloader, SourceDownloader};
///
/// let downloader = HttpDownloader::default();
/// let json = downloader.download_text("https://pypi.org/pypi/tomli/2.0.1/json")?;
/// assert!(json.contains("tomli"));
/// # Ok::<(), keg_installer::fetch::download::DownloadError>(())
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait SourceDownloader {
    /// Download `url` and write the body to `dest`, replacing any existing
    /// file.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the resource does not exist,
    /// or the file cannot be written.
    fn download(&self, url: &str, dest: &Path) -> Result<(), DownloadError>;

    /// Download `url` and return the body as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the resource does not exist,
    /// or the body is not valid UTF-8.
    fn download_text(&self, url: &str) -> Result<String, DownloadError>;
}

/// Errors arising from download operations.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested artefact was not found (HTTP 404 or missing file).
    #[error("artefact not found: {url}")]
    NotFound {
        /// The URL that could not be found.
        url: String,
    },

    /// The URL uses a scheme other than `http`, `https`, or `file`.
    #[error("unsupported URL scheme: {url}")]
    UnsupportedScheme {
        /// The rejected URL.
        url: String,
    },

    /// I/O error reading or writing the downloaded file.
    #[error("I/O error during download: {0}")]
    Io(#[from] std::io::Error),
}

/// Downloader using a shared `ureq` agent for remote URLs.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    agent: ureq::Agent,
}

impl HttpDownloader {
    /// Create a downloader whose requests time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }

    fn get(&self, url: &str) -> Result<ureq::http::Response<ureq::Body>, DownloadError> {
        self.agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new(DEFAULT_DOWNLOAD_TIMEOUT)
    }
}

impl SourceDownloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        match classify(url)? {
            Location::Local(path) => {
                trace!("copying {} to {}", path.display(), dest.display());
                std::fs::copy(&path, dest).map_err(|e| local_error(url, e))?;
            }
            Location::Remote => {
                trace!("downloading {url} to {}", dest.display());
                let response = self.get(url)?;
                let mut file = std::fs::File::create(dest)?;
                let mut body = response.into_body();
                std::io::copy(&mut body.as_reader(), &mut file)?;
            }
        }
        Ok(())
    }

    fn download_text(&self, url: &str) -> Result<String, DownloadError> {
        match classify(url)? {
            Location::Local(path) => {
                std::fs::read_to_string(&path).map_err(|e| local_error(url, e))
            }
            Location::Remote => {
                trace!("fetching {url}");
                self.get(url)?
                    .into_body()
                    .read_to_string()
                    .map_err(|e| DownloadError::HttpError {
                        url: url.to_owned(),
                        reason: e.to_string(),
                    })
            }
        }
    }
}

enum Location {
    Local(PathBuf),
    Remote,
}

fn classify(url: &str) -> Result<Location, DownloadError> {
    if let Some(path) = url.strip_prefix(FILE_SCHEME) {
        return Ok(Location::Local(PathBuf::from(path)));
    }
    if url.starts_with("https://") || url.starts_with("http://") {
        return Ok(Location::Remote);
    }
    Err(DownloadError::UnsupportedScheme {
        url: url.to_owned(),
    })
}

fn local_error(url: &str, err: std::io::Error) -> DownloadError {
    if err.kind() == std::io::ErrorKind::NotFound {
        DownloadError::NotFound {
            url: url.to_owned(),
        }
    } else {
        DownloadError::Io(err)
    }
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

/// Build a `file://` URL for a local path.
///
/// # Examples
///
/// ```
/// use keg_installer::fetch::download::file_url;
/// use std::path::Path;
///
/// assert_eq!(file_url(Path::new("/srv/mirror/v0.5.3.tar.gz")), "file:///srv/mirror/v0.5.3.tar.gz");
/// ```
#[must_use]
pub fn file_url(path: &Path) -> String {
    format!("{FILE_SCHEME}{}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn map_ureq_error_maps_404_to_not_found() {
        let err = ureq::Error::StatusCode(404);
        let mapped = map_ureq_error("https://example.test/v0.5.3.tar.gz", &err);
        assert!(matches!(mapped, DownloadError::NotFound { .. }));
    }

    #[test]
    fn map_ureq_error_maps_other_status_to_http_error() {
        let err = ureq::Error::StatusCode(500);
        let mapped = map_ureq_error("https://example.test/v0.5.3.tar.gz", &err);
        assert!(matches!(mapped, DownloadError::HttpError { .. }));
    }

    #[rstest]
    #[case::ftp("ftp://example.test/archive.tar.gz")]
    #[case::bare_path("/srv/archive.tar.gz")]
    #[case::git("git+https://example.test/repo")]
    fn rejects_unsupported_schemes(#[case] url: &str) {
        let temp = tempfile::tempdir().expect("temp dir");
        let result = HttpDownloader::default().download(url, &temp.path().join("out"));
        assert!(matches!(result, Err(DownloadError::UnsupportedScheme { .. })));
    }

    #[test]
    fn copies_file_urls() {
        let temp = tempfile::tempdir().expect("temp dir");
        let source = temp.path().join("tomli-2.0.1.tar.gz");
        std::fs::write(&source, b"archive bytes").expect("write source");
        let dest = temp.path().join("copy");

        HttpDownloader::default()
            .download(&file_url(&source), &dest)
            .expect("copy local file");
        assert_eq!(std::fs::read(&dest).expect("read copy"), b"archive bytes");
    }

    #[test]
    fn missing_local_file_is_not_found() {
        let temp = tempfile::tempdir().expect("temp dir");
        let url = file_url(&temp.path().join("absent.tar.gz"));
        let result = HttpDownloader::default().download_text(&url);
        assert!(matches!(result, Err(DownloadError::NotFound { .. })));
    }
}
