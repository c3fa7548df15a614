//! Remote endpoints for iconpack.
//!
//! Two services sit on the other side of the pipeline: the icon service that
//! lists a project's icons and serves their markup ([`IconSource`]), and the
//! artifact feed that receives the finished package archive
//! ([`ArtifactFeed`]). Both have ureq-backed HTTP implementations in
//! [`http`] and in-memory doubles in [`mock`]. [`fetch_all`] drives an
//! `IconSource` with bounded concurrency.

pub mod config;
pub mod fetch;
pub mod http;
pub mod listing;
pub mod mock;

pub use config::{FeedConfig, IconServiceConfig, DEFAULT_TOKEN_ENV};
pub use fetch::{fetch_all, MAX_CONCURRENCY};
pub use http::{HttpFeed, HttpIconSource, DIGEST_HEADER};
pub use listing::{parse_listing, IconImage, IconRecord, ListQuery};

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("remote config error: {0}")]
    Config(String),
}

/// Lists a project's icons and serves each image's markup.
pub trait IconSource: Send + Sync {
    fn list_icons(&self, query: &ListQuery) -> Result<Vec<IconRecord>, RemoteError>;

    /// Retrieve the markup stored at `path` (an `iconImagePath` from the listing).
    fn fetch_markup(&self, path: &str) -> Result<String, RemoteError>;
}

/// Metadata sent alongside an archive upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub package_name: String,
    pub version: String,
    pub file_name: String,
    /// `blake3:<hex>` digest of the archive bytes.
    pub digest: String,
    pub size: u64,
}

impl UploadRequest {
    /// Describe the archive at `path`, hashing it in one streaming pass.
    pub fn for_file(
        package_name: impl Into<String>,
        version: impl Into<String>,
        path: &Path,
    ) -> Result<Self, RemoteError> {
        let mut hasher = blake3::Hasher::new();
        let size = io::copy(&mut File::open(path)?, &mut hasher)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| RemoteError::Config(format!("'{}' has no file name", path.display())))?;
        Ok(Self {
            package_name: package_name.into(),
            version: version.into(),
            file_name,
            digest: format!("blake3:{}", hasher.finalize().to_hex()),
            size,
        })
    }
}

/// Receives finished package archives.
pub trait ArtifactFeed: Send + Sync {
    /// Stream `body` to the feed. Returns the remote reference the feed
    /// reported for the stored package.
    fn upload(&self, request: &UploadRequest, body: &mut dyn Read) -> Result<String, RemoteError>;
}
