//! Source archive extraction.
//!
//! Unpacks `.tar.gz` source distributions into a scratch directory with path
//! traversal protection. GitHub tag archives carry a `pax_global_header`
//! entry, which is metadata rather than content and is skipped.

use log::trace;
use std::path::{Component, Path, PathBuf};
use tar::EntryType;

/// Trait for extracting source archives, enabling test mocking.
///
/// # Examples
///
/// ```no_run
/// use keg_installer::fetch::extraction::{ArchiveExtractor, TarGzExtractor};
/// use std::path::Path;
///
/// let entries = TarGzExtractor.extract(Path::new("tomli-2.0.1.tar.gz"), Path::new("build"))?;
/// assert!(!entries.is_empty());
/// # Ok::<(), keg_installer::fetch::extraction::ExtractionError>(())
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// Returns the archive-relative paths of the extracted regular files.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry
    /// attempts to escape the destination directory.
    /// Returns [`ExtractionError::EmptyArchive`] if no files are found.
    /// Returns [`ExtractionError::Io`] on I/O failures, including archives
    /// that are not gzip-compressed tarballs.
    fn extract(&self, archive_path: &Path, dest_dir: &Path)
    -> Result<Vec<PathBuf>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,
}

/// Extractor for gzip-compressed tarballs using `flate2` and `tar`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractionError> {
        let file = std::fs::File::open(archive_path)?;
        let decoder = flate2::read::GzDecoder::new(file);
        let mut archive = tar::Archive::new(decoder);
        std::fs::create_dir_all(dest_dir)?;
        let mut extracted = Vec::new();

        for entry_result in archive.entries()? {
            let mut entry = entry_result?;
            let entry_type = entry.header().entry_type();
            if matches!(entry_type, EntryType::XGlobalHeader | EntryType::XHeader) {
                continue;
            }

            let entry_path = entry.path()?.into_owned();
            validate_entry_path(&entry_path)?;

            if !entry.unpack_in(dest_dir)? {
                return Err(ExtractionError::PathTraversal {
                    path: entry_path.display().to_string(),
                });
            }
            if entry_type.is_file() {
                extracted.push(entry_path);
            }
        }

        if extracted.is_empty() {
            return Err(ExtractionError::EmptyArchive);
        }

        trace!(
            "extracted {} files from {} into {}",
            extracted.len(),
            archive_path.display(),
            dest_dir.display()
        );
        Ok(extracted)
    }
}

/// Validate that a tar entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use rstest::rstest;

    fn write_archive(path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).expect("create archive");
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, contents) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, *contents)
                .expect("append entry");
        }
        builder
            .into_inner()
            .expect("tar finish")
            .finish()
            .expect("gzip finish");
    }

    #[test]
    fn extracts_sdist_layout() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let archive_path = temp_dir.path().join("tomli-2.0.1.tar.gz");
        let dest_dir = temp_dir.path().join("out");
        write_archive(
            &archive_path,
            &[
                ("tomli-2.0.1/pyproject.toml", b"[project]\nname = \"tomli\"\n"),
                ("tomli-2.0.1/src/tomli/__init__.py", b""),
            ],
        );

        let files = TarGzExtractor
            .extract(&archive_path, &dest_dir)
            .expect("extract");
        assert_eq!(
            files,
            vec![
                PathBuf::from("tomli-2.0.1/pyproject.toml"),
                PathBuf::from("tomli-2.0.1/src/tomli/__init__.py"),
            ]
        );
        assert!(dest_dir.join("tomli-2.0.1/src/tomli/__init__.py").exists());
    }

    #[rstest]
    #[case::parent_dir("../escape.txt")]
    #[case::nested_parent("foo/../../escape.txt")]
    fn rejects_path_traversal(#[case] bad_path: &str) {
        let path = PathBuf::from(bad_path);
        let result = validate_entry_path(&path);
        assert!(
            matches!(result, Err(ExtractionError::PathTraversal { .. })),
            "expected PathTraversal for {bad_path}"
        );
    }

    #[test]
    fn accepts_normal_paths() {
        assert!(validate_entry_path(Path::new("gen-commit-0.5.3/setup.py")).is_ok());
    }

    #[test]
    fn rejects_absolute_path() {
        let result = validate_entry_path(Path::new("/etc/passwd"));
        assert!(matches!(result, Err(ExtractionError::PathTraversal { .. })));
    }

    #[test]
    fn extract_empty_archive() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let archive_path = temp_dir.path().join("empty.tar.gz");
        write_archive(&archive_path, &[]);

        let result = TarGzExtractor.extract(&archive_path, &temp_dir.path().join("out"));
        assert!(matches!(result, Err(ExtractionError::EmptyArchive)));
    }

    #[test]
    fn non_gzip_input_is_io_error() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let archive_path = temp_dir.path().join("broken.tar.gz");
        std::fs::write(&archive_path, b"<html>rate limited</html>").expect("write");

        let result = TarGzExtractor.extract(&archive_path, &temp_dir.path().join("out"));
        assert!(matches!(result, Err(ExtractionError::Io(_))));
    }
}
