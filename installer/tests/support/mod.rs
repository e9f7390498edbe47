//! Test support utilities for installer behavioural tests.
//!
//! This module provides a local package mirror: source distributions written
//! to a temporary directory and served through `file://` URLs, plus the
//! descriptor text that points at them.

use camino::Utf8PathBuf;
use keg_installer::fetch::download::file_url;
use keg_installer::test_utils::write_sdist;
use tempfile::TempDir;

/// An archive published on the mirror.
#[derive(Debug, Clone)]
pub struct Published {
    /// Distribution name.
    pub name: String,
    /// Directory inside the archive, as in `tomli-2.0.1`.
    pub top_dir: String,
    /// `file://` URL of the archive.
    pub url: String,
    /// SHA-256 of the archive.
    pub checksum: String,
    /// Location of the archive on disk.
    pub path: Utf8PathBuf,
}

/// A temporary directory holding a mirror, a cache, and a prefix root.
pub struct Mirror {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl Mirror {
    /// Creates an empty mirror.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_owned()).expect("non-UTF8 temp path");
        Self { _temp: temp, root }
    }

    /// Directory packages install under.
    pub fn prefix_root(&self) -> Utf8PathBuf {
        self.root.join("Cellar")
    }

    /// Download cache directory.
    pub fn cache_dir(&self) -> Utf8PathBuf {
        self.root.join("cache")
    }

    /// Publishes `name` at `version` as a minimal source distribution.
    pub fn publish(&self, name: &str, version: &str) -> Published {
        let top_dir = format!("{name}-{version}");
        let dir = self.root.join("mirror");
        std::fs::create_dir_all(&dir).expect("failed to create mirror dir");
        let path = dir.join(format!("{top_dir}.tar.gz"));
        let pyproject = format!("[project]\nname = \"{name}\"\nversion = \"{version}\"\n");
        let checksum = write_sdist(
            path.as_std_path(),
            &top_dir,
            &[("pyproject.toml", pyproject.as_bytes())],
        )
        .expect("failed to write sdist");

        Published {
            name: name.to_owned(),
            url: file_url(path.as_std_path()),
            checksum: checksum.into_inner(),
            top_dir,
            path,
        }
    }

    /// Writes a descriptor for `source` with `resources` in the given order
    /// and returns its path.
    pub fn write_descriptor(
        &self,
        source: &Published,
        version: &str,
        resources: &[Published],
        test_command: &str,
    ) -> Utf8PathBuf {
        let mut text = format!(
            "name = \"{}\"\nversion = \"{version}\"\nsource_url = \"{}\"\nsource_checksum = \"{}\"\nbuild_dependencies = [\"python@3.12\"]\n\n",
            source.name, source.url, source.checksum
        );
        for resource in resources {
            text.push_str(&format!(
                "[[bundled_resources]]\nname = \"{}\"\nsource_url = \"{}\"\nsource_checksum = \"{}\"\n\n",
                resource.name, resource.url, resource.checksum
            ));
        }
        text.push_str(&format!(
            "[test_procedure]\ncommand = \"{test_command}\"\nargs = [\"--version\"]\n"
        ));

        let path = self.root.join(format!("{}.toml", source.name));
        std::fs::write(&path, text).expect("failed to write descriptor");
        path
    }
}

/// Flips the first hex digit of a checksum.
pub fn corrupt_checksum(checksum: &str) -> String {
    let mut chars: Vec<char> = checksum.chars().collect();
    if let Some(first) = chars.first_mut() {
        *first = if *first == '0' { '1' } else { '0' };
    }
    chars.into_iter().collect()
}
