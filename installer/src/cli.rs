//! CLI argument definitions for keg.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::config::Overrides;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Install self-contained Python command-line tools from package descriptors.
#[derive(Parser, Debug)]
#[command(name = "keg")]
#[command(version, about)]
#[command(long_about = concat!(
    "Install self-contained Python command-line tools from package descriptors.\n\n",
    "A descriptor names a source archive, its SHA-256, the pinned resources ",
    "bundled with it, and a smoke test. keg downloads and verifies every ",
    "archive, builds an isolated virtualenv under <prefix>/libexec, links the ",
    "package's executables into <prefix>/bin, and runs the smoke test.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Check a descriptor without touching the network:\n",
    "    $ keg validate formulae/gen-commit.toml\n\n",
    "  Install into the default prefix root:\n",
    "    $ keg install formulae/gen-commit.toml\n\n",
    "  Preview an install:\n",
    "    $ keg install formulae/gen-commit.toml --dry-run\n\n",
    "  List installed packages:\n",
    "    $ keg list\n\n",
    "  Generate resources from pinned requirements:\n",
    "    $ keg resources requirements.txt\n",
))]
pub struct Cli {
    /// Configuration file [default: <config dir>/keg/config.toml].
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Parse and validate a descriptor.
    Validate(ValidateArgs),

    /// Download and verify a descriptor's archives into the cache.
    Fetch(FetchArgs),

    /// Fetch, install, and smoke-test a package.
    Install(InstallArgs),

    /// Run the smoke test against an existing install.
    Test(TestArgs),

    /// List installed packages.
    List(ListArgs),

    /// Generate bundled resources from a pinned requirements file.
    Resources(ResourcesArgs),
}

/// Arguments for the validate command.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Descriptor file (`.toml` or `.json`).
    pub descriptor: Utf8PathBuf,
}

/// Download cache options shared by fetch and install.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheArgs {
    /// Download cache directory [default: platform-specific].
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Extra attempts for failed downloads.
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,
}

/// Arguments for the fetch command.
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Descriptor file (`.toml` or `.json`).
    pub descriptor: Utf8PathBuf,

    /// Download cache options.
    #[command(flatten)]
    pub cache: CacheArgs,

    /// Suppress progress output (errors still shown).
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the install command.
#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    /// Descriptor file (`.toml` or `.json`).
    pub descriptor: Utf8PathBuf,

    /// Install prefix [default: <prefix root>/<name>/<version>].
    #[arg(long, value_name = "DIR", conflicts_with = "prefix_root")]
    pub prefix: Option<Utf8PathBuf>,

    /// Directory packages install under [default: platform-specific].
    #[arg(long, value_name = "DIR")]
    pub prefix_root: Option<Utf8PathBuf>,

    /// Download cache options.
    #[command(flatten)]
    pub cache: CacheArgs,

    /// Replace an existing install.
    #[arg(long)]
    pub force: bool,

    /// Do not run the smoke test after installing.
    #[arg(long)]
    pub skip_test: bool,

    /// Show the install plan and exit without changing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase pip output verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        alias = "verbosity",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

/// Arguments for the test command.
#[derive(Args, Debug, Clone)]
pub struct TestArgs {
    /// Descriptor file (`.toml` or `.json`).
    pub descriptor: Utf8PathBuf,

    /// Install prefix [default: <prefix root>/<name>/<version>].
    #[arg(long, value_name = "DIR", conflicts_with = "prefix_root")]
    pub prefix: Option<Utf8PathBuf>,

    /// Directory packages install under [default: platform-specific].
    #[arg(long, value_name = "DIR")]
    pub prefix_root: Option<Utf8PathBuf>,
}

/// Arguments for the list command.
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,

    /// Directory to scan [default: platform-specific].
    #[arg(long, value_name = "DIR")]
    pub prefix_root: Option<Utf8PathBuf>,
}

/// Arguments for the resources command.
#[derive(Args, Debug, Clone)]
pub struct ResourcesArgs {
    /// A requirements file of `name==version` pins.
    pub requirements: Utf8PathBuf,
}

impl Command {
    /// Settings given on the command line for this subcommand.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use keg_installer::cli::Cli;
    ///
    /// let cli = Cli::parse_from(["keg", "fetch", "gen-commit.toml", "--retries", "2"]);
    /// assert_eq!(cli.command.overrides().retries, Some(2));
    /// ```
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        let (prefix_root, cache) = match self {
            Self::Fetch(args) => (None, Some(&args.cache)),
            Self::Install(args) => (args.prefix_root.clone(), Some(&args.cache)),
            Self::Test(args) => (args.prefix_root.clone(), None),
            Self::List(args) => (args.prefix_root.clone(), None),
            Self::Validate(_) | Self::Resources(_) => (None, None),
        };
        Overrides {
            prefix_root,
            cache_dir: cache.and_then(|args| args.cache_dir.clone()),
            retries: cache.and_then(|args| args.retries),
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
