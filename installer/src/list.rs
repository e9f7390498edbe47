//! List command implementation.
//!
//! This module provides the `run_list` command handler, which scans the
//! prefix root for install receipts and prints what it finds.

use std::io::Write;

use crate::config::Settings;
use crate::error::{InstallerError, Result};
use crate::list_output::{format_human, format_json};
use crate::scanner::scan_installed;

/// Lists installed packages.
///
/// Scans the prefix root resolved into `settings` for install receipts and
/// formats the result for display. Output is written to stdout
/// (human-readable by default, JSON when `json` is set).
///
/// # Errors
///
/// Returns an error if:
/// - No prefix root is configured and the platform offers no default
/// - The prefix root cannot be scanned
/// - Writing to stdout fails
pub fn run_list(json: bool, settings: &Settings, stdout: &mut dyn Write) -> Result<()> {
    let prefix_root = settings.prefix_root()?;

    let installed =
        scan_installed(prefix_root).map_err(|e| InstallerError::ScanFailed { source: e })?;

    let output = if json {
        format_json(&installed)
    } else {
        format_human(&installed)
    };

    writeln!(stdout, "{output}").map_err(|e| InstallerError::WriteFailed { source: e })?;

    Ok(())
}
