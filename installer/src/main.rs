//! keg CLI entrypoint.
//!
//! This binary validates package descriptors, fetches and verifies their
//! archives, installs them into isolated prefixes, and smoke-tests the
//! result. Progress and errors go to stderr; command output such as listings
//! and generated resources goes to stdout.

use camino::Utf8Path;
use clap::Parser;
use keg_descriptor::load_descriptor;
use keg_installer::cli::{Cli, Command, FetchArgs, InstallArgs, ResourcesArgs, TestArgs};
use keg_installer::config::{Overrides, Settings, load_config};
use keg_installer::deps::{CommandExecutor, SystemCommandExecutor};
use keg_installer::dirs::{BaseDirs, NoBaseDirs, SystemBaseDirs};
use keg_installer::error::{InstallerError, Result};
use keg_installer::fetch::download::{HttpDownloader, SourceDownloader};
use keg_installer::fetch::extraction::{ArchiveExtractor, TarGzExtractor};
use keg_installer::list::run_list;
use keg_installer::output::write_stderr_line;
use keg_installer::pipeline::{
    PipelineContext, PipelineOptions, fetch_sources, run_pipeline, run_smoke_test, target_prefix,
};
use keg_installer::requirements::{generate_resources, render_resources_toml};
use log::debug;
use std::io::Write;

/// Production collaborators shared by the commands that need them.
struct Runtime {
    executor: Box<dyn CommandExecutor>,
    downloader: Box<dyn SourceDownloader>,
    extractor: Box<dyn ArchiveExtractor>,
}

impl Runtime {
    fn system(settings: &Settings) -> Self {
        Self {
            executor: Box::new(SystemCommandExecutor),
            downloader: Box::new(HttpDownloader::new(settings.download_timeout)),
            extractor: Box::new(TarGzExtractor),
        }
    }

    fn context<'a>(&'a self, settings: &'a Settings, quiet: bool) -> PipelineContext<'a> {
        PipelineContext {
            settings,
            executor: self.executor.as_ref(),
            downloader: self.downloader.as_ref(),
            extractor: self.extractor.as_ref(),
            quiet,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    // Validation reads nothing but the descriptor, so a broken config file
    // must not block it.
    if let Command::Validate(args) = &cli.command {
        return run_validate(&args.descriptor, stdout);
    }

    let settings = load_settings(cli.config.as_deref(), cli.command.overrides())?;
    debug!("resolved settings: {settings:?}");
    let runtime = Runtime::system(&settings);

    match &cli.command {
        Command::Validate(args) => run_validate(&args.descriptor, stdout),
        Command::Fetch(args) => run_fetch(args, &runtime.context(&settings, args.quiet), stderr),
        Command::Install(args) => {
            run_install(args, &runtime.context(&settings, args.quiet), stderr)
        }
        Command::Test(args) => run_test(args, &runtime.context(&settings, false), stderr),
        Command::List(args) => run_list(args.json, &settings, stdout),
        Command::Resources(args) => {
            run_resources(args, runtime.downloader.as_ref(), stdout, stderr)
        }
    }
}

/// Loads the configuration file and combines it with command-line overrides.
fn load_settings(config: Option<&Utf8Path>, overrides: Overrides) -> Result<Settings> {
    match SystemBaseDirs::new() {
        Some(dirs) => settings_from(config, overrides, &dirs),
        None => {
            debug!("no home directory; platform defaults unavailable");
            settings_from(config, overrides, &NoBaseDirs)
        }
    }
}

fn settings_from(
    config: Option<&Utf8Path>,
    overrides: Overrides,
    dirs: &dyn BaseDirs,
) -> Result<Settings> {
    let file = load_config(config, dirs)?;
    Ok(Settings::resolve(file, overrides, dirs))
}

/// Parses and validates a descriptor without touching the network.
fn run_validate(path: &Utf8Path, stdout: &mut dyn Write) -> Result<()> {
    let descriptor = load_descriptor(path)?;
    writeln!(
        stdout,
        "{} {} is valid ({} bundled resources)",
        descriptor.name(),
        descriptor.version(),
        descriptor.bundled_resources().len()
    )
    .map_err(|e| InstallerError::WriteFailed { source: e })
}

/// Downloads and verifies every archive into the cache.
fn run_fetch(args: &FetchArgs, context: &PipelineContext<'_>, stderr: &mut dyn Write) -> Result<()> {
    let descriptor = load_descriptor(&args.descriptor)?;
    fetch_sources(context, &descriptor, stderr)?;
    Ok(())
}

fn run_install(
    args: &InstallArgs,
    context: &PipelineContext<'_>,
    stderr: &mut dyn Write,
) -> Result<()> {
    let options = PipelineOptions {
        prefix: args.prefix.clone(),
        force: args.force,
        skip_test: args.skip_test,
        dry_run: args.dry_run,
        verbosity: args.verbosity,
    };
    run_pipeline(context, &args.descriptor, &options, stderr)?;
    Ok(())
}

/// Smoke-tests an existing install.
fn run_test(args: &TestArgs, context: &PipelineContext<'_>, stderr: &mut dyn Write) -> Result<()> {
    let descriptor = load_descriptor(&args.descriptor)?;
    let prefix = target_prefix(args.prefix.as_deref(), context.settings, &descriptor)?;
    run_smoke_test(context, &descriptor, &prefix, stderr)?;
    Ok(())
}

/// Prints `[[bundled_resources]]` blocks for a requirements file.
fn run_resources(
    args: &ResourcesArgs,
    downloader: &dyn SourceDownloader,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    let requirements =
        std::fs::read_to_string(&args.requirements).map_err(|e| InstallerError::ReadFailed {
            path: args.requirements.clone(),
            source: e,
        })?;

    let generated = generate_resources(&requirements, downloader);
    for warning in &generated.warnings {
        write_stderr_line(stderr, format!("warning: {warning}"));
    }

    let toml = render_resources_toml(&generated.resources).map_err(|e| {
        InstallerError::WriteFailed {
            source: std::io::Error::other(e),
        }
    })?;
    write!(stdout, "{toml}").map_err(|e| InstallerError::WriteFailed { source: e })
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
