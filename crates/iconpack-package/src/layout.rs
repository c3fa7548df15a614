use crate::PackageError;
use chrono::Utc;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Untyped component subtree, relative to the output root.
pub const UNTYPED_DIR: &str = "dist/jsx";
/// Typed component and declaration subtree, relative to the output root.
pub const TYPED_DIR: &str = "dist/tsx";
pub const MANIFEST_FILE: &str = "package.json";

static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Per-run suffix for output roots and archive names: a millisecond UTC
/// timestamp plus 8 hex characters mixed from the process id and a
/// process-wide counter, so concurrent runs never share a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    pub fn generate() -> Self {
        let now = Utc::now();
        let seq = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let mut hasher = blake3::Hasher::new();
        hasher.update(&std::process::id().to_le_bytes());
        hasher.update(&seq.to_le_bytes());
        hasher.update(&now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
        let hex = hasher.finalize().to_hex();
        Self(format!("{}-{}", now.format("%Y%m%d%H%M%S%3f"), &hex[..8]))
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// On-disk package tree for one run, plus the archive produced from it.
///
/// The layout is released exactly once: [`teardown`](Self::teardown) removes
/// the archive and the whole output root and reports failures,
/// [`persist`](Self::persist) keeps both. If neither runs (a panic unwinding
/// through a stage), `Drop` removes whatever exists and logs failures.
#[derive(Debug)]
pub struct PackageLayout {
    root: PathBuf,
    archive: PathBuf,
    released: bool,
}

impl PackageLayout {
    pub fn new(root: impl Into<PathBuf>, archive: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            archive: archive.into(),
            released: false,
        }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn archive_path(&self) -> &Path {
        &self.archive
    }

    #[inline]
    pub fn untyped_dir(&self) -> PathBuf {
        self.root.join(UNTYPED_DIR)
    }

    #[inline]
    pub fn typed_dir(&self) -> PathBuf {
        self.root.join(TYPED_DIR)
    }

    #[inline]
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Create the output root and both subtrees, truncating a previous tree
    /// at the same path.
    pub fn initialize(&self) -> Result<(), PackageError> {
        if self.root.exists() {
            debug!("truncating existing output root {}", self.root.display());
            fs::remove_dir_all(&self.root)?;
        }
        fs::create_dir_all(self.untyped_dir())?;
        fs::create_dir_all(self.typed_dir())?;
        Ok(())
    }

    /// Remove the archive and the output root. Missing paths are not errors.
    pub fn teardown(mut self) -> Result<(), PackageError> {
        self.released = true;
        remove_all(&self.root, &self.archive)
    }

    /// Keep the tree and archive on disk and hand back their paths.
    pub fn persist(mut self) -> (PathBuf, PathBuf) {
        self.released = true;
        (self.root.clone(), self.archive.clone())
    }
}

impl Drop for PackageLayout {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(
            "package layout {} dropped without teardown, removing",
            self.root.display()
        );
        if let Err(e) = remove_all(&self.root, &self.archive) {
            warn!("fallback cleanup failed: {e}");
        }
    }
}

/// Attempt both removals; report the first failure.
fn remove_all(root: &Path, archive: &Path) -> Result<(), PackageError> {
    let archive_result = match fs::remove_file(archive) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PackageError::Cleanup {
            path: archive.to_path_buf(),
            source,
        }),
    };
    let root_result = match fs::remove_dir_all(root) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PackageError::Cleanup {
            path: root.to_path_buf(),
            source,
        }),
    };
    debug!("removed {} and {}", root.display(), archive.display());
    archive_result.and(root_result)
}
