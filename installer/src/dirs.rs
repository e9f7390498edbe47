//! Directory resolution abstraction for platform-specific paths.
//!
//! keg keeps three kinds of state: its configuration file, the download
//! cache, and the default prefix root that packages install under. The
//! [`BaseDirs`] trait hides where the platform puts each of them so tests
//! can substitute temporary directories.

use std::path::PathBuf;

/// Application directory name used under each platform base directory.
pub const APP_DIR: &str = "keg";

/// Platform directories used by keg.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// Directory holding `config.toml`, such as `~/.config/keg`.
    fn keg_config_dir(&self) -> Option<PathBuf>;

    /// Directory for persistent data, such as `~/.local/share/keg`.
    fn keg_data_dir(&self) -> Option<PathBuf>;

    /// Directory for the download cache, such as `~/.cache/keg`.
    fn keg_cache_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by `directories-next`.
///
/// # Examples
///
/// ```no_run
/// use keg_installer::dirs::{BaseDirs, SystemBaseDirs};
///
/// let dirs = SystemBaseDirs::new().expect("failed to initialise directories");
/// assert!(dirs.keg_cache_dir().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct SystemBaseDirs {
    inner: directories_next::BaseDirs,
}

impl SystemBaseDirs {
    /// Resolve the platform directories.
    ///
    /// Returns `None` when no home directory can be found.
    #[must_use]
    pub fn new() -> Option<Self> {
        directories_next::BaseDirs::new().map(|inner| Self { inner })
    }
}

impl BaseDirs for SystemBaseDirs {
    fn keg_config_dir(&self) -> Option<PathBuf> {
        Some(self.inner.config_dir().join(APP_DIR))
    }

    fn keg_data_dir(&self) -> Option<PathBuf> {
        Some(self.inner.data_dir().join(APP_DIR))
    }

    fn keg_cache_dir(&self) -> Option<PathBuf> {
        Some(self.inner.cache_dir().join(APP_DIR))
    }
}

/// [`BaseDirs`] used when the platform offers none; every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBaseDirs;

impl BaseDirs for NoBaseDirs {
    fn keg_config_dir(&self) -> Option<PathBuf> {
        None
    }

    fn keg_data_dir(&self) -> Option<PathBuf> {
        None
    }

    fn keg_cache_dir(&self) -> Option<PathBuf> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn system_dirs_follow_xdg_variables() {
        let temp = tempfile::tempdir().expect("temp dir");
        let data = temp.path().join("data");
        let cache = temp.path().join("cache");
        let config = temp.path().join("config");
        temp_env::with_vars(
            [
                ("HOME", Some(temp.path().as_os_str())),
                ("XDG_DATA_HOME", Some(data.as_os_str())),
                ("XDG_CACHE_HOME", Some(cache.as_os_str())),
                ("XDG_CONFIG_HOME", Some(config.as_os_str())),
            ],
            || {
                let dirs = SystemBaseDirs::new().expect("home directory available");
                assert_eq!(dirs.keg_data_dir(), Some(data.join(APP_DIR)));
                assert_eq!(dirs.keg_cache_dir(), Some(cache.join(APP_DIR)));
                assert_eq!(dirs.keg_config_dir(), Some(config.join(APP_DIR)));
            },
        );
    }

    #[test]
    fn no_base_dirs_resolves_nothing() {
        let dirs = NoBaseDirs;
        assert!(dirs.keg_data_dir().is_none());
        assert!(dirs.keg_cache_dir().is_none());
        assert!(dirs.keg_config_dir().is_none());
    }
}
