//! Output formatting for the keg CLI.
//!
//! Progress and diagnostics go to stderr; only `keg list` and
//! `keg resources` write to stdout.

use crate::install::Installation;
use camino::Utf8Path;
use keg_descriptor::PackageDescriptor;
use std::io::Write;

/// Write a line to stderr, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Format a success message after installation.
///
/// # Example
///
/// ```
/// use camino::Utf8PathBuf;
/// use keg_installer::output::success_message;
///
/// let prefix = Utf8PathBuf::from("/opt/keg/Cellar/gen-commit/0.5.3");
/// let msg = success_message("gen-commit", "0.5.3", &prefix, 1);
/// assert!(msg.contains("1 executable"));
/// ```
#[must_use]
pub fn success_message(name: &str, version: &str, prefix: &Utf8Path, linked: usize) -> String {
    let plural = if linked == 1 { "executable" } else { "executables" };
    format!("Successfully installed {name} {version} to {prefix} ({linked} {plural} linked)")
}

/// Format the executables made available by an install.
#[must_use]
pub fn linked_executables_text(installation: &Installation) -> String {
    installation
        .linked
        .iter()
        .map(|link| format!("  {link}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// What an install would do, shown by `--dry-run`.
///
/// # Example
///
/// ```
/// use camino::Utf8PathBuf;
/// use keg_descriptor::{DescriptorFormat, parse_and_validate};
/// use keg_installer::output::DryRunPlan;
///
/// let text = format!(
///     "name = \"gen-commit\"\nsource_url = \"https://example.test/v0.5.3.tar.gz\"\nsource_checksum = \"{}\"\n",
///     "0".repeat(64)
/// );
/// let descriptor = parse_and_validate(&text, DescriptorFormat::Toml).expect("valid");
/// let prefix = Utf8PathBuf::from("/opt/keg/Cellar/gen-commit/0.5.3");
///
/// let plan = DryRunPlan { descriptor: &descriptor, prefix: &prefix, force: false, skip_test: false };
/// let output = plan.display_text();
/// assert!(output.contains("Dry run"));
/// assert!(output.contains("0.5.3"));
/// ```
#[derive(Debug)]
pub struct DryRunPlan<'a> {
    /// The validated descriptor.
    pub descriptor: &'a PackageDescriptor,
    /// Target prefix.
    pub prefix: &'a Utf8Path,
    /// Whether an existing install would be replaced.
    pub force: bool,
    /// Whether the smoke test would be skipped.
    pub skip_test: bool,
}

impl DryRunPlan<'_> {
    /// Format the plan for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let descriptor = self.descriptor;
        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Package: {}", descriptor.name()),
            format!("Version: {}", descriptor.version()),
            format!("Source: {}", descriptor.source_url()),
            format!("Prefix: {}", self.prefix),
            format!("Runtime: {}", descriptor.runtime_executable()),
            format!("Replace existing: {}", self.force),
        ];

        let smoke = match descriptor.test_procedure() {
            Some(_) if self.skip_test => "skipped".to_owned(),
            Some(procedure) => procedure.to_string(),
            None => "none declared".to_owned(),
        };
        lines.push(format!("Smoke test: {smoke}"));

        lines.push(String::new());
        lines.push("Resources to install:".to_owned());
        let resources = descriptor.resources_in_install_order();
        if resources.is_empty() {
            lines.push("  (none)".to_owned());
        }
        for resource in resources {
            lines.push(format!("  - {}", resource.name()));
        }

        lines.join("\n")
    }
}
