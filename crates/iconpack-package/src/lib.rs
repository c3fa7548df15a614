//! Package assembly for iconpack.
//!
//! This crate turns generated component sources into an npm-style package on
//! disk: `PackageLayout` owns the per-run output root and archive path and
//! guarantees their removal, `PackageManifest` is the synthesized
//! `package.json`, `TarGzArchiver` writes a deterministic `.tgz`, and
//! `Assembler` ties them together for one run.

pub mod archive;
pub mod assemble;
pub mod layout;
pub mod manifest;

pub use archive::{Archiver, TarGzArchiver, ARCHIVE_PREFIX};
pub use assemble::{AssembledPackage, Assembler, PackageSettings};
pub use layout::{PackageLayout, RunId, MANIFEST_FILE, TYPED_DIR, UNTYPED_DIR};
pub use manifest::{
    archive_stem, package_name_from_project, resolve_version, validate_package_name,
    validate_version, PackageManifest, VersionStrategy,
};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("package I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("archive error: {0}")]
    Archive(String),
    #[error("invalid package name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
    #[error("invalid package version '{0}', expected MAJOR.MINOR.PATCH")]
    InvalidVersion(String),
    #[error("failed to remove '{}': {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{primary}; cleanup also failed: {cleanup}")]
    CleanupAfterFailure {
        primary: Box<PackageError>,
        cleanup: Box<PackageError>,
    },
}
