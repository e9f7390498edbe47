//! Package descriptors for keg.
//!
//! A descriptor is a declarative record of one installable command-line
//! package: where its source archive lives, the SHA-256 it must hash to,
//! the pinned resources bundled alongside it, which interpreter it needs,
//! and how to smoke-test the result. This crate parses descriptors from
//! TOML or JSON and validates them; it performs no I/O beyond reading the
//! descriptor file itself.
//!
//! # Modules
//!
//! - [`dependency`] - Build and runtime dependency declarations
//! - [`descriptor`] - The validated descriptor record
//! - [`error`] - Schema, checksum-format, and parse errors
//! - [`package_name`] - Validated package and resource names
//! - [`parser`] - TOML and JSON parsing entry points
//! - [`procedure`] - Install and smoke-test procedures
//! - [`resource`] - Bundled resources
//! - [`sha256_digest`] - SHA-256 digest values
//! - [`validation`] - Raw-to-validated descriptor conversion
//! - [`version`] - Versions and inference from archive URLs

pub mod dependency;
pub mod descriptor;
pub mod error;
pub mod package_name;
pub mod parser;
pub mod procedure;
pub mod resource;
pub mod sha256_digest;
pub mod validation;
pub mod version;

pub use descriptor::{PackageDescriptor, RawDescriptor};
pub use error::{DescriptorError, Result};
pub use parser::{DescriptorFormat, load_descriptor, parse_and_validate, parse_descriptor};
pub use resource::Resource;
pub use sha256_digest::Sha256Digest;
pub use validation::validate;
