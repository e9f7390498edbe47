//! Configuration file loading and settings resolution.
//!
//! Settings come from three layers, highest precedence first: command-line
//! flags, `config.toml` (from `--config` or the platform config directory),
//! and platform defaults from [`BaseDirs`].
//!
//! ```toml
//! prefix_root = "/opt/keg/Cellar"
//! cache_dir = "/var/cache/keg"
//! retries = 2
//! download_timeout_secs = 30
//! smoke_test_timeout_secs = 60
//! ```

use crate::dirs::BaseDirs;
use crate::error::{InstallerError, Result};
use crate::fetch::download::DEFAULT_DOWNLOAD_TIMEOUT;
use crate::smoke::DEFAULT_SMOKE_TEST_TIMEOUT;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// File name of the configuration file inside the config directory.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Directory under the data directory where packages are installed.
pub const DEFAULT_PREFIX_ROOT_DIR: &str = "Cellar";

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Directory packages install under.
    pub prefix_root: Option<Utf8PathBuf>,
    /// Download cache directory.
    pub cache_dir: Option<Utf8PathBuf>,
    /// Extra download attempts.
    pub retries: Option<u32>,
    /// Network timeout per download, in seconds.
    pub download_timeout_secs: Option<u64>,
    /// Smoke-test timeout, in seconds.
    pub smoke_test_timeout_secs: Option<u64>,
}

/// Settings supplied on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// `--prefix-root`.
    pub prefix_root: Option<Utf8PathBuf>,
    /// `--cache-dir`.
    pub cache_dir: Option<Utf8PathBuf>,
    /// `--retries`.
    pub retries: Option<u32>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    prefix_root: Option<Utf8PathBuf>,
    cache_dir: Option<Utf8PathBuf>,
    /// Extra download attempts.
    pub retries: u32,
    /// Network timeout per download.
    pub download_timeout: Duration,
    /// Smoke-test timeout.
    pub smoke_test_timeout: Duration,
}

impl Settings {
    /// Combine the layers, with `overrides` taking precedence over `file`
    /// and `file` over platform defaults.
    #[must_use]
    pub fn resolve(file: FileConfig, overrides: Overrides, dirs: &dyn BaseDirs) -> Self {
        let prefix_root = overrides.prefix_root.or(file.prefix_root).or_else(|| {
            utf8_dir(dirs.keg_data_dir()).map(|data| data.join(DEFAULT_PREFIX_ROOT_DIR))
        });
        let cache_dir = overrides
            .cache_dir
            .or(file.cache_dir)
            .or_else(|| utf8_dir(dirs.keg_cache_dir()));

        Self {
            prefix_root,
            cache_dir,
            retries: overrides.retries.or(file.retries).unwrap_or(0),
            download_timeout: file
                .download_timeout_secs
                .map_or(DEFAULT_DOWNLOAD_TIMEOUT, Duration::from_secs),
            smoke_test_timeout: file
                .smoke_test_timeout_secs
                .map_or(DEFAULT_SMOKE_TEST_TIMEOUT, Duration::from_secs),
        }
    }

    /// Directory packages install under.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::MissingDirectory`] when neither the command
    /// line, the config file, nor the platform supplies one.
    pub fn prefix_root(&self) -> Result<&Utf8Path> {
        self.prefix_root
            .as_deref()
            .ok_or(InstallerError::MissingDirectory { what: "prefix root" })
    }

    /// Download cache directory.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::MissingDirectory`] when none is available.
    pub fn cache_dir(&self) -> Result<&Utf8Path> {
        self.cache_dir
            .as_deref()
            .ok_or(InstallerError::MissingDirectory { what: "cache directory" })
    }
}

/// Load the configuration file.
///
/// An explicit path must exist. Without one, the platform config directory
/// is consulted and a missing file yields the defaults.
///
/// # Errors
///
/// Returns [`InstallerError::Config`] when the file cannot be read or is not
/// valid.
pub fn load_config(explicit: Option<&Utf8Path>, dirs: &dyn BaseDirs) -> Result<FileConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match utf8_dir(dirs.keg_config_dir()) {
            Some(dir) => {
                let path = dir.join(CONFIG_FILENAME);
                if !path.is_file() {
                    debug!("no configuration file at {path}");
                    return Ok(FileConfig::default());
                }
                path
            }
            None => return Ok(FileConfig::default()),
        },
    };

    let text = std::fs::read_to_string(&path).map_err(|err| InstallerError::Config {
        path: path.clone(),
        reason: err.to_string(),
    })?;
    parse_config(&text, &path)
}

/// Parse configuration text read from `path`.
///
/// # Errors
///
/// Returns [`InstallerError::Config`] on syntax errors or unknown keys.
pub fn parse_config(text: &str, path: &Utf8Path) -> Result<FileConfig> {
    toml::from_str(text).map_err(|err| InstallerError::Config {
        path: path.to_path_buf(),
        reason: err.message().to_owned(),
    })
}

fn utf8_dir(dir: Option<PathBuf>) -> Option<Utf8PathBuf> {
    dir.and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirs::{MockBaseDirs, NoBaseDirs};
    use rstest::rstest;

    fn dirs_at(root: &Utf8Path) -> MockBaseDirs {
        let mut dirs = MockBaseDirs::new();
        let data = root.join("data").into_std_path_buf();
        let cache = root.join("cache").into_std_path_buf();
        let config = root.join("config").into_std_path_buf();
        dirs.expect_keg_data_dir().returning(move || Some(data.clone()));
        dirs.expect_keg_cache_dir().returning(move || Some(cache.clone()));
        dirs.expect_keg_config_dir().returning(move || Some(config.clone()));
        dirs
    }

    fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        (temp, path)
    }

    #[test]
    fn defaults_come_from_platform_directories() {
        let root = Utf8Path::new("/home/user");
        let settings = Settings::resolve(FileConfig::default(), Overrides::default(), &dirs_at(root));

        assert_eq!(
            settings.prefix_root().expect("prefix root"),
            root.join("data").join("Cellar")
        );
        assert_eq!(settings.cache_dir().expect("cache dir"), root.join("cache"));
        assert_eq!(settings.retries, 0);
        assert_eq!(settings.download_timeout, DEFAULT_DOWNLOAD_TIMEOUT);
        assert_eq!(settings.smoke_test_timeout, DEFAULT_SMOKE_TEST_TIMEOUT);
    }

    #[test]
    fn overrides_beat_file_which_beats_defaults() {
        let file = FileConfig {
            prefix_root: Some(Utf8PathBuf::from("/opt/keg/Cellar")),
            cache_dir: Some(Utf8PathBuf::from("/var/cache/keg")),
            retries: Some(1),
            download_timeout_secs: Some(5),
            smoke_test_timeout_secs: Some(10),
        };
        let overrides = Overrides {
            retries: Some(3),
            cache_dir: Some(Utf8PathBuf::from("/tmp/cache")),
            ..Overrides::default()
        };

        let settings = Settings::resolve(file, overrides, &dirs_at(Utf8Path::new("/home/user")));

        assert_eq!(settings.prefix_root().expect("prefix root"), "/opt/keg/Cellar");
        assert_eq!(settings.cache_dir().expect("cache dir"), "/tmp/cache");
        assert_eq!(settings.retries, 3);
        assert_eq!(settings.download_timeout, Duration::from_secs(5));
        assert_eq!(settings.smoke_test_timeout, Duration::from_secs(10));
    }

    #[test]
    fn missing_platform_directories_are_reported_when_needed() {
        let settings = Settings::resolve(FileConfig::default(), Overrides::default(), &NoBaseDirs);
        assert!(matches!(
            settings.prefix_root(),
            Err(InstallerError::MissingDirectory { what: "prefix root" })
        ));
        assert!(matches!(
            settings.cache_dir(),
            Err(InstallerError::MissingDirectory { .. })
        ));
    }

    #[test]
    fn absent_default_config_file_yields_defaults() {
        let (_temp, root) = temp_root();
        let config = load_config(None, &dirs_at(&root)).expect("defaults");
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn default_config_file_is_read() {
        let (_temp, root) = temp_root();
        let dir = root.join("config");
        std::fs::create_dir_all(&dir).expect("create config dir");
        std::fs::write(dir.join(CONFIG_FILENAME), "retries = 2\n").expect("write config");

        let config = load_config(None, &dirs_at(&root)).expect("config");
        assert_eq!(config.retries, Some(2));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let (_temp, root) = temp_root();
        let err = load_config(Some(&root.join("absent.toml")), &NoBaseDirs).expect_err("missing");
        assert!(matches!(err, InstallerError::Config { .. }));
    }

    #[rstest]
    #[case::unknown_key("prefix = \"/opt\"\n")]
    #[case::wrong_type("retries = \"many\"\n")]
    #[case::syntax("retries = \n")]
    fn invalid_config_is_rejected(#[case] text: &str) {
        let err = parse_config(text, Utf8Path::new("config.toml")).expect_err("invalid");
        assert!(err.to_string().contains("config.toml"));
    }
}
