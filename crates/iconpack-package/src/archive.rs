use crate::PackageError;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory every entry is nested under inside the archive, as npm expects.
pub const ARCHIVE_PREFIX: &str = "package";

const FILE_MODE: u32 = 0o644;
const DIR_MODE: u32 = 0o755;

/// Produces a single compressed archive from a directory tree.
pub trait Archiver: Send + Sync {
    /// File extension of produced archives, without the dot.
    fn extension(&self) -> &'static str;

    /// Archive everything under `source_dir` into `dest`. `dest` must not lie
    /// inside `source_dir`.
    fn archive(&self, source_dir: &Path, dest: &Path) -> Result<(), PackageError>;
}

/// Gzip-compressed tar with deterministic content: entries sorted by path,
/// zeroed mtime and ownership, fixed modes. Two runs over identical trees
/// produce byte-identical archives.
#[derive(Debug, Clone, Copy)]
pub struct TarGzArchiver {
    level: u32,
}

impl TarGzArchiver {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

impl Default for TarGzArchiver {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl Archiver for TarGzArchiver {
    fn extension(&self) -> &'static str {
        "tgz"
    }

    fn archive(&self, source_dir: &Path, dest: &Path) -> Result<(), PackageError> {
        if !source_dir.is_dir() {
            return Err(PackageError::Archive(format!(
                "source '{}' is not a directory",
                source_dir.display()
            )));
        }
        let mut entries = collect_entries(source_dir, source_dir)?;
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let file = File::create(dest)?;
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::new(self.level));
        let mut ar = tar::Builder::new(encoder);
        ar.follow_symlinks(false);

        append_dir(&mut ar, ARCHIVE_PREFIX)?;
        for (rel_path, full_path) in &entries {
            let ft = full_path.symlink_metadata()?.file_type();
            let name = format!("{ARCHIVE_PREFIX}/{rel_path}");
            if ft.is_file() {
                append_file(&mut ar, &name, full_path)?;
            } else if ft.is_dir() {
                append_dir(&mut ar, &name)?;
            } else {
                warn!("skipping unsupported file type: {rel_path}");
            }
        }

        let encoder = ar.into_inner()?;
        let mut writer = encoder.finish()?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| PackageError::Io(e.into_error()))?
            .sync_all()?;
        debug!(
            "archived {} entries from {} into {}",
            entries.len(),
            source_dir.display(),
            dest.display()
        );
        Ok(())
    }
}

/// Recursively collect (`/`-joined relative path, full path) pairs.
fn collect_entries(root: &Path, current: &Path) -> Result<Vec<(String, PathBuf)>, PackageError> {
    let mut result = Vec::new();
    for entry in fs::read_dir(current)? {
        let full = entry?.path();
        let rel = full
            .strip_prefix(root)
            .map_err(|e| PackageError::Archive(format!("path strip: {e}")))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if full.symlink_metadata()?.is_dir() {
            result.push((rel, full.clone()));
            result.extend(collect_entries(root, &full)?);
        } else {
            result.push((rel, full));
        }
    }
    Ok(result)
}

fn header(entry_type: tar::EntryType, mode: u32, size: u64) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mode(mode);
    header.set_size(size);
    header.set_cksum();
    header
}

fn append_file<W: Write>(
    ar: &mut tar::Builder<W>,
    name: &str,
    full_path: &Path,
) -> Result<(), PackageError> {
    let data = fs::read(full_path)?;
    let mut header = header(tar::EntryType::Regular, FILE_MODE, data.len() as u64);
    ar.append_data(&mut header, name, data.as_slice())?;
    Ok(())
}

fn append_dir<W: Write>(ar: &mut tar::Builder<W>, name: &str) -> Result<(), PackageError> {
    let mut header = header(tar::EntryType::Directory, DIR_MODE, 0);
    ar.append_data(&mut header, format!("{name}/"), &[] as &[u8])?;
    Ok(())
}
