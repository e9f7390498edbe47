//! Output formatting for package listing.
//!
//! This module provides utilities to format installed package information
//! for human-readable or JSON output.

use serde::Serialize;

use crate::scanner::InstalledPackages;

/// Format installed packages for human-readable output.
///
/// # Examples
///
/// ```
/// use keg_installer::list_output::format_human;
/// use keg_installer::scanner::InstalledPackages;
///
/// let output = format_human(&InstalledPackages::default());
/// assert!(output.contains("No packages installed"));
/// ```
#[must_use]
pub fn format_human(packages: &InstalledPackages) -> String {
    if packages.is_empty() {
        return String::from(
            "No packages installed.\n\nRun `keg install <DESCRIPTOR>` to install a package.",
        );
    }

    let mut output = String::from("Installed packages:\n");

    for (name, installs) in &packages.by_name {
        output.push('\n');
        output.push_str(&format!("{name}\n"));

        for install in installs {
            let receipt = &install.receipt;
            output.push_str(&format!("  {}  {}\n", receipt.version(), install.prefix));
            if !receipt.executables().is_empty() {
                output.push_str(&format!(
                    "    executables: {}\n",
                    receipt.executables().join(", ")
                ));
            }
            output.push_str(&format!("    resources: {}\n", receipt.resources().len()));
        }
    }

    output
}

/// Format installed packages as JSON.
///
/// # Examples
///
/// ```
/// use keg_installer::list_output::format_json;
/// use keg_installer::scanner::InstalledPackages;
///
/// let json = format_json(&InstalledPackages::default());
/// assert!(json.contains("\"packages\""));
/// ```
#[must_use]
pub fn format_json(packages: &InstalledPackages) -> String {
    let json_data = InstalledPackagesJson::from_installed(packages);
    serde_json::to_string_pretty(&json_data).unwrap_or_else(|_| "{}".to_owned())
}

/// JSON-serializable representation of installed packages.
#[derive(Debug, Serialize)]
pub struct InstalledPackagesJson {
    /// Every installed package version.
    pub packages: Vec<PackageEntry>,
}

impl InstalledPackagesJson {
    fn from_installed(installed: &InstalledPackages) -> Self {
        let packages = installed
            .by_name
            .values()
            .flatten()
            .map(|install| {
                let receipt = &install.receipt;
                PackageEntry {
                    name: receipt.name().to_owned(),
                    version: receipt.version().to_owned(),
                    prefix: install.prefix.to_string(),
                    executables: receipt.executables().to_vec(),
                    resources: receipt
                        .resources()
                        .iter()
                        .map(|resource| resource.name.clone())
                        .collect(),
                    installed_at: receipt.installed_at(),
                    install_duration_secs: receipt.install_duration().as_secs(),
                }
            })
            .collect();

        Self { packages }
    }
}

/// JSON entry for one installed package version.
#[derive(Debug, Serialize)]
pub struct PackageEntry {
    /// Package name.
    pub name: String,
    /// Installed version.
    pub version: String,
    /// Install prefix.
    pub prefix: String,
    /// Linked executables.
    pub executables: Vec<String>,
    /// Bundled resource names.
    pub resources: Vec<String>,
    /// Install time in seconds since the Unix epoch.
    pub installed_at: u64,
    /// Wall-clock install duration in whole seconds.
    pub install_duration_secs: u64,
}
