//! Hash-gated writer for generated files such as the CI workflow.
//!
//! Content is normalised to LF and compared by SHA-256 against what is on
//! disk; identical content leaves the file (and its mtime) alone. Otherwise
//! the bytes go to a sibling `<name>.repomirror.tmp` that is renamed over the
//! destination, so readers never observe a half-written file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{io_err, SyncError};

/// What [`atomic_write`] did with one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    Written { path: PathBuf },
    /// On-disk content already matched.
    Unchanged { path: PathBuf },
    /// Dry run and the content differs.
    WouldWrite { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            Self::Written { path } | Self::Unchanged { path } | Self::WouldWrite { path } => path,
        }
    }
}

/// Write `content` to `path` unless the file already holds it.
pub fn atomic_write(path: &Path, content: &str, dry_run: bool) -> Result<WriteResult, SyncError> {
    let content = content.replace("\r\n", "\n");
    let wanted = text_digest(&content);

    let on_disk = match std::fs::read(path) {
        Ok(bytes) => Some(text_digest(&String::from_utf8_lossy(&bytes).replace("\r\n", "\n"))),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(io_err(path, e)),
    };
    let path_buf = path.to_path_buf();
    if on_disk.as_deref() == Some(wanted.as_str()) {
        tracing::debug!(path = %path.display(), "generated file unchanged");
        return Ok(WriteResult::Unchanged { path: path_buf });
    }
    if dry_run {
        tracing::info!(path = %path.display(), "[dry-run] would write");
        return Ok(WriteResult::WouldWrite { path: path_buf });
    }

    let staged = StagedFile::create(path, content.as_bytes())?;
    staged.commit()?;
    tracing::info!(path = %path.display(), "wrote generated file");
    Ok(WriteResult::Written { path: path_buf })
}

/// A fully written temp sibling; removed on drop unless committed.
struct StagedFile {
    tmp: PathBuf,
    dest: PathBuf,
    committed: bool,
}

impl StagedFile {
    fn create(dest: &Path, bytes: &[u8]) -> Result<Self, SyncError> {
        let dir = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

        let mut name = dest
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".repomirror.tmp");
        let tmp = dir.join(name);
        std::fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
        Ok(Self {
            tmp,
            dest: dest.to_path_buf(),
            committed: false,
        })
    }

    fn commit(mut self) -> Result<(), SyncError> {
        std::fs::rename(&self.tmp, &self.dest).map_err(|e| io_err(&self.dest, e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.tmp);
        }
    }
}

fn text_digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
