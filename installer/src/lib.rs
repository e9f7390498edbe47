//! keg installer library.
//!
//! This crate fetches, verifies, installs, and smoke-tests packages described
//! by keg descriptors. It is used by the `keg` CLI binary and can be consumed
//! programmatically for testing or custom installation workflows.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Configuration file loading and settings resolution
//! - [`deps`] - Command execution and build dependency checks
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Semantic error types for every install stage
//! - [`fetch`] - Downloading and unpacking source archives
//! - [`install`] - Isolated virtualenv installation into a prefix
//! - [`list`] - The `list` command
//! - [`list_output`] - Output formatting for package listing
//! - [`output`] - Progress and summary messages
//! - [`pipeline`] - Validate, resolve, install, and smoke-test orchestration
//! - [`receipt`] - Install receipts written into each prefix
//! - [`requirements`] - Resource generation from pinned requirements
//! - [`resolve`] - Checksum-verified artefact resolution with a download cache
//! - [`scanner`] - Discovery of installed packages under a prefix root
//! - [`smoke`] - Post-install smoke tests

pub mod cli;
pub mod config;
pub mod deps;
pub mod dirs;
pub mod error;
pub mod fetch;
pub mod install;
pub mod list;
pub mod list_output;
pub mod output;
pub mod pipeline;
pub mod receipt;
pub mod requirements;
pub mod resolve;
pub mod scanner;
pub mod smoke;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
