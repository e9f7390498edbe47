//! Receipt scanner for discovering installed packages.
//!
//! Packages live under the prefix root as `<root>/<name>/<version>/`, each
//! with an install receipt. Directories without a readable receipt are
//! partial or foreign and are skipped.

use std::collections::BTreeMap;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;

use crate::receipt::{InstallReceipt, read_receipt};

/// An installed package discovered by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    /// The prefix holding the install.
    pub prefix: Utf8PathBuf,
    /// The receipt read from the prefix.
    pub receipt: InstallReceipt,
}

/// Installed packages grouped by name.
#[derive(Debug, Clone, Default)]
pub struct InstalledPackages {
    /// Map from package name to its installed versions, ordered by version
    /// directory name.
    pub by_name: BTreeMap<String, Vec<InstalledPackage>>,
}

impl InstalledPackages {
    /// Returns true if no packages are installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Scan the prefix root for installed packages.
///
/// The directory structure is:
/// ```text
/// {prefix_root}/{name}/{version}/INSTALL_RECEIPT.json
/// ```
///
/// A missing prefix root yields an empty result.
///
/// # Errors
///
/// Returns an error if a directory cannot be read.
pub fn scan_installed(prefix_root: &Utf8Path) -> io::Result<InstalledPackages> {
    let mut result = InstalledPackages::default();

    if !prefix_root.exists() {
        return Ok(result);
    }

    for entry_result in prefix_root.read_dir_utf8()? {
        let entry = entry_result?;
        if !entry.path().is_dir() {
            continue;
        }

        let packages = scan_package_dir(entry.path())?;
        if !packages.is_empty() {
            result.by_name.insert(entry.file_name().to_owned(), packages);
        }
    }

    Ok(result)
}

fn scan_package_dir(package_dir: &Utf8Path) -> io::Result<Vec<InstalledPackage>> {
    let mut packages = Vec::new();

    for entry_result in package_dir.read_dir_utf8()? {
        let entry = entry_result?;
        let prefix = entry.path();
        if !prefix.is_dir() {
            continue;
        }

        match read_receipt(prefix) {
            Ok(receipt) => packages.push(InstalledPackage {
                prefix: prefix.to_owned(),
                receipt,
            }),
            Err(err) => debug!("skipping {prefix}: {err}"),
        }
    }

    packages.sort_by(|a, b| a.prefix.cmp(&b.prefix));
    Ok(packages)
}
