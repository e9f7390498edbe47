//! The `virtualenv-with-resources` install routine.
//!
//! Installs a resolved descriptor into an isolated prefix:
//!
//! ```text
//! <prefix>/
//!   libexec/             virtualenv holding the package and its resources
//!   bin/<exe>            links to libexec/bin/<exe>
//!   INSTALL_RECEIPT.json
//! ```
//!
//! Resources are installed one by one with `pip --no-deps`, in name order,
//! before the package itself. Any failure removes the prefix again, so a
//! prefix either holds a complete install or does not exist.

use crate::deps::{CommandExecutor, check_build_dependencies};
use crate::error::{InstallerError, Result};
use crate::fetch::extraction::ArchiveExtractor;
use crate::receipt::{InstallReceipt, write_receipt};
use crate::resolve::{ResolvedArtefact, ResolvedSources};
use camino::{Utf8Path, Utf8PathBuf};
use keg_descriptor::PackageDescriptor;
use keg_descriptor::procedure::InstallProcedure;
use log::{debug, warn};
use std::time::Instant;

/// Directory inside the prefix holding the virtualenv.
pub const LIBEXEC_DIR: &str = "libexec";

/// Directory inside the prefix holding executable links.
pub const BIN_DIR: &str = "bin";

/// Scratch directory inside the prefix used while unpacking archives.
pub const BUILD_DIR: &str = ".keg-build";

/// Directory inside the virtualenv holding its scripts.
#[cfg(not(windows))]
pub const VENV_BIN_DIR: &str = "bin";
/// Directory inside the virtualenv holding its scripts.
#[cfg(windows)]
pub const VENV_BIN_DIR: &str = "Scripts";

/// Settings for one install.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Target prefix.
    pub prefix: Utf8PathBuf,
    /// Replace an existing install at `prefix`.
    pub force: bool,
    /// Number of `-v` flags passed to pip.
    pub verbosity: u8,
}

/// A completed install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    /// The prefix the package was installed into.
    pub prefix: Utf8PathBuf,
    /// Executable links created under `<prefix>/bin`.
    pub linked: Vec<Utf8PathBuf>,
    /// The receipt written into the prefix.
    pub receipt: InstallReceipt,
}

/// Path of the virtualenv interpreter for a prefix.
#[must_use]
pub fn venv_python(prefix: &Utf8Path) -> Utf8PathBuf {
    prefix.join(LIBEXEC_DIR).join(VENV_BIN_DIR).join("python")
}

/// Install `descriptor` from its resolved artefacts.
///
/// # Errors
///
/// Returns [`InstallerError::Dependency`] when a build dependency is not
/// satisfied, [`InstallerError::AlreadyInstalled`] when the prefix exists
/// and `force` is not set, and [`InstallerError::Build`] when any install
/// step fails. The prefix is removed on every error raised after it was
/// created.
pub fn install(
    descriptor: &PackageDescriptor,
    sources: &ResolvedSources,
    executor: &dyn CommandExecutor,
    extractor: &dyn ArchiveExtractor,
    options: &InstallOptions,
) -> Result<Installation> {
    let started = Instant::now();
    check_build_dependencies(executor, descriptor.build_dependencies())?;

    let prefix = &options.prefix;
    prepare_prefix(prefix, options.force)?;
    let guard = PrefixGuard::new(prefix);

    let procedure = descriptor.install_procedure();
    debug!("installing {} with {procedure}", descriptor.name());
    match procedure {
        InstallProcedure::VirtualenvWithResources => {
            install_virtualenv_with_resources(descriptor, sources, executor, extractor, options)?;
        }
    }

    let linked = link_executables(descriptor, prefix)?;
    let receipt = InstallReceipt::new(descriptor, started.elapsed());
    write_receipt(prefix, &receipt).map_err(|err| InstallerError::build("write receipt", err))?;

    guard.disarm();
    debug!("installed {} into {prefix}", descriptor.name());
    Ok(Installation {
        prefix: prefix.clone(),
        linked,
        receipt,
    })
}

fn prepare_prefix(prefix: &Utf8Path, force: bool) -> Result<()> {
    if prefix.exists() {
        if !force {
            return Err(InstallerError::AlreadyInstalled {
                prefix: prefix.to_path_buf(),
            });
        }
        debug!("removing existing install at {prefix}");
        std::fs::remove_dir_all(prefix)
            .map_err(|err| InstallerError::build("remove existing install", err))?;
    }
    std::fs::create_dir_all(prefix).map_err(|err| InstallerError::build("create prefix", err))
}

fn install_virtualenv_with_resources(
    descriptor: &PackageDescriptor,
    sources: &ResolvedSources,
    executor: &dyn CommandExecutor,
    extractor: &dyn ArchiveExtractor,
    options: &InstallOptions,
) -> Result<()> {
    let prefix = &options.prefix;
    create_virtualenv(descriptor, executor, prefix)?;
    for artefact in sources.resources.iter().chain(std::iter::once(&sources.source)) {
        install_artefact(artefact, executor, extractor, prefix, options.verbosity)?;
    }
    std::fs::remove_dir_all(prefix.join(BUILD_DIR))
        .map_err(|err| InstallerError::build("remove build directory", err))
}

fn create_virtualenv(
    descriptor: &PackageDescriptor,
    executor: &dyn CommandExecutor,
    prefix: &Utf8Path,
) -> Result<()> {
    let runtime = descriptor.runtime_executable();
    let libexec = prefix.join(LIBEXEC_DIR);
    run_step(
        executor,
        "create virtualenv",
        &runtime,
        &["-m", "venv", libexec.as_str()],
    )
}

fn install_artefact(
    artefact: &ResolvedArtefact,
    executor: &dyn CommandExecutor,
    extractor: &dyn ArchiveExtractor,
    prefix: &Utf8Path,
    verbosity: u8,
) -> Result<()> {
    let scratch = prefix.join(BUILD_DIR).join(&artefact.name);
    extractor
        .extract(artefact.path.as_std_path(), scratch.as_std_path())
        .map_err(|err| InstallerError::build(format!("extract {}", artefact.name), err))?;
    let root = source_root(&scratch)?;

    let python = venv_python(prefix);
    let mut args = vec!["-m", "pip", "install", "--no-deps", "--ignore-installed"];
    args.extend(std::iter::repeat_n("-v", usize::from(verbosity)));
    args.push(root.as_str());
    run_step(
        executor,
        &format!("install {}", artefact.name),
        python.as_str(),
        &args,
    )
}

/// The directory to hand to pip: the single top-level directory of an
/// unpacked sdist, or the scratch directory itself.
fn source_root(scratch: &Utf8Path) -> Result<Utf8PathBuf> {
    let entries = scratch
        .read_dir_utf8()
        .and_then(|entries| entries.collect::<std::io::Result<Vec<_>>>())
        .map_err(|err| InstallerError::build(format!("read {scratch}"), err))?;
    match entries.as_slice() {
        [only] if only.path().is_dir() => Ok(only.path().to_path_buf()),
        _ => Ok(scratch.to_path_buf()),
    }
}

fn run_step(executor: &dyn CommandExecutor, step: &str, cmd: &str, args: &[&str]) -> Result<()> {
    debug!("{step}: {cmd} {}", args.join(" "));
    let output = executor
        .run(cmd, args)
        .map_err(|err| InstallerError::build(step, format!("could not run `{cmd}`: {err}")))?;
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(InstallerError::build(
        step,
        format!("`{cmd}` exited with {}: {}", output.status, stderr.trim()),
    ))
}

fn link_executables(descriptor: &PackageDescriptor, prefix: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let bin = prefix.join(BIN_DIR);
    std::fs::create_dir_all(&bin).map_err(|err| InstallerError::build("create bin directory", err))?;
    let venv_bin = prefix.join(LIBEXEC_DIR).join(VENV_BIN_DIR);

    descriptor
        .executables()
        .into_iter()
        .map(|exe| {
            let target = venv_bin.join(exe);
            if !target.is_file() {
                return Err(InstallerError::build(
                    format!("link {exe}"),
                    format!("{target} was not installed by the package"),
                ));
            }
            let link = bin.join(exe);
            link_file(&target, &link)
                .map_err(|err| InstallerError::build(format!("link {exe}"), err))?;
            Ok(link)
        })
        .collect()
}

#[cfg(unix)]
fn link_file(target: &Utf8Path, link: &Utf8Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn link_file(target: &Utf8Path, link: &Utf8Path) -> std::io::Result<()> {
    std::fs::copy(target, link).map(|_| ())
}

/// Removes a partially populated prefix unless disarmed.
struct PrefixGuard {
    path: Utf8PathBuf,
    armed: bool,
}

impl PrefixGuard {
    fn new(path: &Utf8Path) -> Self {
        Self {
            path: path.to_path_buf(),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PrefixGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        debug!("rolling back partial install at {}", self.path);
        if let Err(err) = std::fs::remove_dir_all(&self.path) {
            warn!("failed to remove partial install at {}: {err}", self.path);
        }
    }
}

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;
