//! Artefact transport: downloading archives and unpacking them.
//!
//! # Sub-modules
//!
//! - [`download`] - Download trait with HTTP(S) and `file://` support.
//! - [`extraction`] - `.tar.gz` extraction with path traversal protection.

pub mod download;
pub mod extraction;
