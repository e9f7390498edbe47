//! Validate, resolve, install, and smoke-test orchestration.
//!
//! This module provides higher-level orchestration for the four stages of an
//! install. It coordinates the resolver, installer, smoke test, and output
//! modules, writing progress to stderr. Each stage is terminal on failure.

use crate::config::Settings;
use crate::deps::CommandExecutor;
use crate::error::Result;
use crate::fetch::download::SourceDownloader;
use crate::fetch::extraction::ArchiveExtractor;
use crate::install::{InstallOptions, Installation, install};
use crate::output::{DryRunPlan, linked_executables_text, success_message, write_stderr_line};
use crate::resolve::{ResolveOptions, ResolvedSources, resolve};
use crate::smoke::{SmokeOutcome, smoke_test};
use camino::{Utf8Path, Utf8PathBuf};
use keg_descriptor::{PackageDescriptor, load_descriptor};
use log::debug;
use std::io::Write;

/// Collaborators and settings shared by every stage.
pub struct PipelineContext<'a> {
    /// Resolved settings.
    pub settings: &'a Settings,
    /// Runs external commands.
    pub executor: &'a dyn CommandExecutor,
    /// Downloads artefacts.
    pub downloader: &'a dyn SourceDownloader,
    /// Unpacks source archives.
    pub extractor: &'a dyn ArchiveExtractor,
    /// Suppress progress output.
    pub quiet: bool,
}

/// Per-install options from the command line.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Explicit prefix; defaults to `<prefix root>/<name>/<version>`.
    pub prefix: Option<Utf8PathBuf>,
    /// Replace an existing install.
    pub force: bool,
    /// Skip the smoke test.
    pub skip_test: bool,
    /// Print the plan and stop.
    pub dry_run: bool,
    /// Number of `-v` flags passed to pip.
    pub verbosity: u8,
}

/// What a pipeline run did.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The plan was printed; nothing changed.
    DryRun {
        /// The prefix the package would be installed into.
        prefix: Utf8PathBuf,
    },
    /// The package was installed.
    Installed {
        /// The completed install.
        installation: Installation,
        /// Smoke test result, or `None` when skipped.
        smoke: Option<SmokeOutcome>,
    },
}

/// The default prefix for a descriptor: `<prefix_root>/<name>/<version>`.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use keg_descriptor::{DescriptorFormat, parse_and_validate};
/// use keg_installer::pipeline::default_prefix;
///
/// let text = format!(
///     "name = \"gen-commit\"\nsource_url = \"https://example.test/v0.5.3.tar.gz\"\nsource_checksum = \"{}\"\n",
///     "0".repeat(64)
/// );
/// let descriptor = parse_and_validate(&text, DescriptorFormat::Toml).expect("valid");
/// let prefix = default_prefix(Utf8Path::new("/opt/keg/Cellar"), &descriptor);
/// assert_eq!(prefix, "/opt/keg/Cellar/gen-commit/0.5.3");
/// ```
#[must_use]
pub fn default_prefix(prefix_root: &Utf8Path, descriptor: &PackageDescriptor) -> Utf8PathBuf {
    prefix_root
        .join(descriptor.name().as_str())
        .join(descriptor.version().as_str())
}

/// The explicit prefix if given, else the default under the prefix root.
///
/// # Errors
///
/// Returns [`crate::error::InstallerError::MissingDirectory`] when no prefix
/// root is available.
pub fn target_prefix(
    explicit: Option<&Utf8Path>,
    settings: &Settings,
    descriptor: &PackageDescriptor,
) -> Result<Utf8PathBuf> {
    match explicit {
        Some(prefix) => Ok(prefix.to_path_buf()),
        None => Ok(default_prefix(settings.prefix_root()?, descriptor)),
    }
}

/// Load the descriptor at `descriptor_path` and run every stage.
///
/// # Errors
///
/// Returns the error of the first stage that fails.
pub fn run_pipeline(
    context: &PipelineContext<'_>,
    descriptor_path: &Utf8Path,
    options: &PipelineOptions,
    stderr: &mut dyn Write,
) -> Result<PipelineOutcome> {
    let descriptor = load_descriptor(descriptor_path)?;
    if !context.quiet {
        write_stderr_line(
            stderr,
            format!(
                "Validated {} {} ({} bundled resources)",
                descriptor.name(),
                descriptor.version(),
                descriptor.bundled_resources().len()
            ),
        );
    }
    install_descriptor(context, &descriptor, options, stderr)
}

/// Run resolve, install, and smoke test for an already validated descriptor.
///
/// # Errors
///
/// Returns the error of the first stage that fails. A smoke-test failure
/// leaves the install in place.
pub fn install_descriptor(
    context: &PipelineContext<'_>,
    descriptor: &PackageDescriptor,
    options: &PipelineOptions,
    stderr: &mut dyn Write,
) -> Result<PipelineOutcome> {
    let prefix = target_prefix(options.prefix.as_deref(), context.settings, descriptor)?;

    if options.dry_run {
        let plan = DryRunPlan {
            descriptor,
            prefix: &prefix,
            force: options.force,
            skip_test: options.skip_test,
        };
        write_stderr_line(stderr, plan.display_text());
        return Ok(PipelineOutcome::DryRun { prefix });
    }

    let sources = fetch_sources(context, descriptor, stderr)?;

    if !context.quiet {
        write_stderr_line(
            stderr,
            format!(
                "Installing {} {} into {prefix}...",
                descriptor.name(),
                descriptor.version()
            ),
        );
    }
    let install_options = InstallOptions {
        prefix,
        force: options.force,
        verbosity: options.verbosity,
    };
    let installation = install(
        descriptor,
        &sources,
        context.executor,
        context.extractor,
        &install_options,
    )?;

    let smoke = if options.skip_test {
        debug!("smoke test skipped");
        None
    } else {
        Some(run_smoke_test(context, descriptor, &installation.prefix, stderr)?)
    };

    if !context.quiet {
        write_stderr_line(
            stderr,
            success_message(
                descriptor.name().as_str(),
                descriptor.version().as_str(),
                &installation.prefix,
                installation.linked.len(),
            ),
        );
        if !installation.linked.is_empty() {
            write_stderr_line(stderr, linked_executables_text(&installation));
        }
    }

    Ok(PipelineOutcome::Installed {
        installation,
        smoke,
    })
}

/// Download and verify every artefact of `descriptor`.
///
/// # Errors
///
/// Returns the resolution error, or
/// [`crate::error::InstallerError::MissingDirectory`] when no cache
/// directory is available.
pub fn fetch_sources(
    context: &PipelineContext<'_>,
    descriptor: &PackageDescriptor,
    stderr: &mut dyn Write,
) -> Result<ResolvedSources> {
    let options = ResolveOptions {
        cache_dir: context.settings.cache_dir()?.to_path_buf(),
        retries: context.settings.retries,
        quiet: context.quiet,
    };
    let sources = resolve(descriptor, context.downloader, &options, stderr)?;
    if !context.quiet {
        write_stderr_line(
            stderr,
            format!(
                "Verified {} archives ({} downloaded)",
                sources.resources.len() + 1,
                sources.downloaded_count()
            ),
        );
    }
    Ok(sources)
}

/// Run the smoke test against the install at `prefix`, reporting progress.
///
/// # Errors
///
/// Returns the smoke-test error.
pub fn run_smoke_test(
    context: &PipelineContext<'_>,
    descriptor: &PackageDescriptor,
    prefix: &Utf8Path,
    stderr: &mut dyn Write,
) -> Result<SmokeOutcome> {
    let outcome = smoke_test(
        descriptor,
        prefix,
        context.executor,
        context.settings.smoke_test_timeout,
    )?;
    if !context.quiet {
        match &outcome {
            SmokeOutcome::Passed { command } => {
                write_stderr_line(stderr, format!("Smoke test passed: {command}"));
            }
            SmokeOutcome::NotDeclared => {
                write_stderr_line(stderr, "No smoke test declared; skipping.");
            }
        }
    }
    Ok(outcome)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
