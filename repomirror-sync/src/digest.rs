//! Content digests for top-level tree entries.
//!
//! A digest covers everything the mirror must reproduce: relative paths,
//! entry kinds, the executable bit, file bytes and symlink targets. Children
//! are visited in byte order of their names so the digest is stable across
//! filesystems.

use std::fs::{self, File, Metadata};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{io_err, SyncError};

/// Kind of a filesystem entry as the mirror sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
}

impl EntryKind {
    /// Classify without following symlinks.
    pub fn of(path: &Path) -> Result<Self, SyncError> {
        let meta = fs::symlink_metadata(path).map_err(|e| io_err(path, e))?;
        Self::from_metadata(path, &meta)
    }

    fn from_metadata(path: &Path, meta: &Metadata) -> Result<Self, SyncError> {
        let ft = meta.file_type();
        if ft.is_symlink() {
            Ok(Self::Symlink)
        } else if ft.is_dir() {
            Ok(Self::Dir)
        } else if ft.is_file() {
            Ok(Self::File)
        } else {
            Err(SyncError::UnsupportedEntry {
                path: path.to_path_buf(),
            })
        }
    }
}

/// SHA-256 hex digest of the entry at `path` and everything beneath it.
pub fn entry_digest(path: &Path) -> Result<String, SyncError> {
    let mut hasher = Sha256::new();
    feed(&mut hasher, path, Path::new(""))?;
    Ok(hex::encode(hasher.finalize()))
}

fn feed(hasher: &mut Sha256, path: &Path, rel: &Path) -> Result<(), SyncError> {
    let meta = fs::symlink_metadata(path).map_err(|e| io_err(path, e))?;
    let rel_bytes = rel.to_string_lossy();
    match EntryKind::from_metadata(path, &meta)? {
        EntryKind::Symlink => {
            let target = fs::read_link(path).map_err(|e| io_err(path, e))?;
            frame(hasher, b"L", rel_bytes.as_bytes());
            frame(hasher, b"T", target.to_string_lossy().as_bytes());
        }
        EntryKind::File => {
            let mode: &[u8] = if is_executable(&meta) { b"x" } else { b"-" };
            frame(hasher, b"F", rel_bytes.as_bytes());
            frame(hasher, b"M", mode);
            hasher.update(meta.len().to_le_bytes());
            let mut file = File::open(path).map_err(|e| io_err(path, e))?;
            std::io::copy(&mut file, hasher).map_err(|e| io_err(path, e))?;
        }
        EntryKind::Dir => {
            frame(hasher, b"D", rel_bytes.as_bytes());
            for name in sorted_children(path)? {
                feed(hasher, &path.join(&name), &rel.join(&name))?;
            }
        }
    }
    Ok(())
}

/// Names directly under `dir`, sorted.
pub(crate) fn sorted_children(dir: &Path) -> Result<Vec<std::ffi::OsString>, SyncError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        names.push(entry.file_name());
    }
    names.sort();
    Ok(names)
}

fn frame(hasher: &mut Sha256, tag: &[u8], data: &[u8]) {
    hasher.update(tag);
    hasher.update((data.len() as u64).to_le_bytes());
    hasher.update(data);
}

#[cfg(unix)]
pub(crate) fn is_executable(meta: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
pub(crate) fn is_executable(_meta: &Metadata) -> bool {
    false
}
