//! Install receipts.
//!
//! A successful install leaves `INSTALL_RECEIPT.json` in its prefix,
//! recording what was installed, from which verified artefacts, and how
//! long it took. `keg list` reads these receipts back.

use camino::{Utf8Path, Utf8PathBuf};
use keg_descriptor::{PackageDescriptor, Sha256Digest};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// File name of the receipt inside an install prefix.
pub const RECEIPT_FILENAME: &str = "INSTALL_RECEIPT.json";

/// A bundled resource as recorded in a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptResource {
    /// Resource name.
    pub name: String,
    /// Verified SHA-256 of the resource archive.
    pub checksum: Sha256Digest,
}

/// Record of one completed install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    name: String,
    version: String,
    source_url: String,
    source_checksum: Sha256Digest,
    resources: Vec<ReceiptResource>,
    executables: Vec<String>,
    runtime: String,
    installed_at: u64,
    install_duration_millis: u64,
}

impl InstallReceipt {
    /// Build a receipt for `descriptor`, stamped with the current time.
    #[must_use]
    pub fn new(descriptor: &PackageDescriptor, duration: Duration) -> Self {
        let installed_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        Self {
            name: descriptor.name().to_string(),
            version: descriptor.version().to_string(),
            source_url: descriptor.source_url().to_owned(),
            source_checksum: descriptor.source_checksum().clone(),
            resources: descriptor
                .resources_in_install_order()
                .into_iter()
                .map(|resource| ReceiptResource {
                    name: resource.name().to_string(),
                    checksum: resource.source_checksum().clone(),
                })
                .collect(),
            executables: descriptor
                .executables()
                .into_iter()
                .map(str::to_owned)
                .collect(),
            runtime: descriptor.runtime_executable(),
            installed_at,
            install_duration_millis: duration_to_millis(duration),
        }
    }

    /// Package name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Installed version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// URL the source archive was fetched from.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Verified checksum of the source archive.
    #[must_use]
    pub const fn source_checksum(&self) -> &Sha256Digest {
        &self.source_checksum
    }

    /// Bundled resources in install order.
    #[must_use]
    pub fn resources(&self) -> &[ReceiptResource] {
        &self.resources
    }

    /// Linked executables.
    #[must_use]
    pub fn executables(&self) -> &[String] {
        &self.executables
    }

    /// Interpreter used to create the virtualenv.
    #[must_use]
    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    /// Install time in seconds since the Unix epoch.
    #[must_use]
    pub const fn installed_at(&self) -> u64 {
        self.installed_at
    }

    /// Wall-clock install duration.
    #[must_use]
    pub const fn install_duration(&self) -> Duration {
        Duration::from_millis(self.install_duration_millis)
    }
}

/// Errors that prevent a receipt from being read or written.
#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    /// Reading the receipt failed.
    #[error("failed to read receipt {path}: {source}")]
    Read {
        /// Receipt path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The receipt is not valid JSON or is missing fields.
    #[error("failed to parse receipt {path}: {source}")]
    Parse {
        /// Receipt path.
        path: Utf8PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Serializing the receipt failed.
    #[error("failed to serialize receipt: {source}")]
    Serialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Writing the receipt failed.
    #[error("failed to write receipt {path}: {source}")]
    Write {
        /// Receipt path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Location of the receipt for an install prefix.
#[must_use]
pub fn receipt_path(prefix: &Utf8Path) -> Utf8PathBuf {
    prefix.join(RECEIPT_FILENAME)
}

/// Write `receipt` into `prefix`.
///
/// # Errors
///
/// Returns [`ReceiptError::Serialize`] or [`ReceiptError::Write`].
pub fn write_receipt(prefix: &Utf8Path, receipt: &InstallReceipt) -> Result<(), ReceiptError> {
    let path = receipt_path(prefix);
    let json = serde_json::to_string_pretty(receipt)
        .map_err(|source| ReceiptError::Serialize { source })?;
    std::fs::write(&path, json).map_err(|source| ReceiptError::Write { path, source })
}

/// Read the receipt stored in `prefix`.
///
/// # Errors
///
/// Returns [`ReceiptError::Read`] when the file is missing or unreadable and
/// [`ReceiptError::Parse`] when it is malformed.
pub fn read_receipt(prefix: &Utf8Path) -> Result<InstallReceipt, ReceiptError> {
    let path = receipt_path(prefix);
    let content = std::fs::read_to_string(&path).map_err(|source| ReceiptError::Read {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ReceiptError::Parse { path, source })
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keg_descriptor::{DescriptorFormat, parse_and_validate};

    fn descriptor() -> PackageDescriptor {
        let digest = "ab".repeat(32);
        let text = format!(
            r#"
name = "gen-commit"
source_url = "https://example.test/v0.5.3.tar.gz"
source_checksum = "{digest}"
build_dependencies = ["python@3.12"]

[[bundled_resources]]
name = "tomli"
source_url = "https://example.test/tomli-2.0.1.tar.gz"
source_checksum = "{digest}"

[[bundled_resources]]
name = "openai"
source_url = "https://example.test/openai-1.36.1.tar.gz"
source_checksum = "{digest}"

[test_procedure]
command = "gencommit"
args = ["--version"]
"#
        );
        parse_and_validate(&text, DescriptorFormat::Toml).expect("valid descriptor")
    }

    fn prefix() -> (tempfile::TempDir, Utf8PathBuf) {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        (temp, path)
    }

    #[test]
    fn receipt_records_descriptor_fields() {
        let receipt = InstallReceipt::new(&descriptor(), Duration::from_millis(1500));
        assert_eq!(receipt.name(), "gen-commit");
        assert_eq!(receipt.version(), "0.5.3");
        assert_eq!(receipt.runtime(), "python3.12");
        assert_eq!(receipt.executables(), ["gencommit"]);
        let names: Vec<_> = receipt.resources().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["openai", "tomli"]);
        assert!(receipt.installed_at() > 0);
    }

    #[test]
    fn written_receipt_reads_back() {
        let (_temp, prefix) = prefix();
        let receipt = InstallReceipt::new(&descriptor(), Duration::from_secs(3));

        write_receipt(&prefix, &receipt).expect("write receipt");
        assert_eq!(read_receipt(&prefix).expect("read receipt"), receipt);
    }

    #[test]
    fn missing_receipt_is_read_error() {
        let (_temp, prefix) = prefix();
        assert!(matches!(
            read_receipt(&prefix),
            Err(ReceiptError::Read { .. })
        ));
    }

    #[test]
    fn malformed_receipt_is_parse_error() {
        let (_temp, prefix) = prefix();
        std::fs::write(receipt_path(&prefix), "{ not json").expect("write");
        assert!(matches!(
            read_receipt(&prefix),
            Err(ReceiptError::Parse { .. })
        ));
    }

    #[test]
    fn write_into_missing_prefix_fails() {
        let (_temp, prefix) = prefix();
        let receipt = InstallReceipt::new(&descriptor(), Duration::ZERO);
        let err = write_receipt(&prefix.join("absent"), &receipt).expect_err("no prefix");
        assert!(matches!(err, ReceiptError::Write { .. }));
    }
}
