//! Unified diffs for `repomirror diff`.
//!
//! Shows what a mirror would change, file by file, with the target as the
//! old side (`a/`) and the source as the new side (`b/`). Nothing is written.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use repomirror_core::AllowList;

use crate::{
    digest::{self, EntryKind},
    error::io_err,
    plan::compute_plan,
    SyncError,
};

/// A single file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Path relative to the tree roots.
    pub path: PathBuf,
    pub unified_diff: String,
}

/// Diff every changed file between `target` (old) and `source` (new).
pub fn diff_trees(
    source: &Path,
    target: &Path,
    allow: &AllowList,
) -> Result<Vec<FileDiff>, SyncError> {
    let plan = compute_plan(source, target, allow)?;
    let mut diffs = Vec::new();

    for entry in plan.changes() {
        let rel = PathBuf::from(&entry.name);
        let mut files = BTreeSet::new();
        collect_files(&source.join(&rel), &rel, &mut files)?;
        collect_files(&target.join(&rel), &rel, &mut files)?;

        for path in files {
            let old = read_side(&target.join(&path))?;
            let new = read_side(&source.join(&path))?;
            let modes = match (file_mode(&target.join(&path))?, file_mode(&source.join(&path))?) {
                (Some(a), Some(b)) if a != b => Some((a, b)),
                _ => None,
            };

            let unified_diff = match (old == new, modes) {
                (true, None) => continue,
                (true, Some((a, b))) => format!(
                    "diff --git a/{p} b/{p}\nold mode {a}\nnew mode {b}\n",
                    p = path.display()
                ),
                (false, Some((a, b))) => {
                    format!("old mode {a}\nnew mode {b}\n{}", render(&path, &old, &new))
                }
                (false, None) => render(&path, &old, &new),
            };
            diffs.push(FileDiff { path, unified_diff });
        }
    }

    Ok(diffs)
}

/// Leaf paths (files and symlinks) under `abs`, recorded relative to the root.
fn collect_files(abs: &Path, rel: &Path, out: &mut BTreeSet<PathBuf>) -> Result<(), SyncError> {
    let kind = match EntryKind::of(abs) {
        Ok(kind) => kind,
        Err(SyncError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
            return Ok(())
        }
        Err(err) => return Err(err),
    };
    match kind {
        EntryKind::Dir => {
            for name in digest::sorted_children(abs)? {
                collect_files(&abs.join(&name), &rel.join(&name), out)?;
            }
        }
        EntryKind::File | EntryKind::Symlink => {
            out.insert(rel.to_path_buf());
        }
    }
    Ok(())
}

/// Git-style mode of a regular file; `None` for anything else or nothing.
fn file_mode(path: &Path) -> Result<Option<&'static str>, SyncError> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(path, e)),
    };
    if !meta.is_file() {
        return Ok(None);
    }
    Ok(Some(if digest::is_executable(&meta) { "100755" } else { "100644" }))
}

#[derive(Debug, PartialEq, Eq)]
enum Side {
    Missing,
    Text(String),
    Binary(Vec<u8>),
    Link(PathBuf),
}

fn read_side(path: &Path) -> Result<Side, SyncError> {
    let kind = match EntryKind::of(path) {
        Ok(kind) => kind,
        Err(SyncError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
            return Ok(Side::Missing)
        }
        Err(err) => return Err(err),
    };
    match kind {
        EntryKind::Symlink => {
            let target = std::fs::read_link(path).map_err(|e| io_err(path, e))?;
            Ok(Side::Link(target))
        }
        EntryKind::Dir => Ok(Side::Missing),
        EntryKind::File => {
            let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
            if bytes.contains(&0) {
                return Ok(Side::Binary(bytes));
            }
            match String::from_utf8(bytes) {
                Ok(text) => Ok(Side::Text(text)),
                Err(err) => Ok(Side::Binary(err.into_bytes())),
            }
        }
    }
}

fn render(path: &Path, old: &Side, new: &Side) -> String {
    let old_header = match old {
        Side::Missing => "/dev/null".to_string(),
        _ => format!("a/{}", path.display()),
    };
    let new_header = match new {
        Side::Missing => "/dev/null".to_string(),
        _ => format!("b/{}", path.display()),
    };

    match (as_text(old), as_text(new)) {
        (Some(old_text), Some(new_text)) => TextDiff::from_lines(old_text.as_str(), new_text.as_str())
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string(),
        _ => format!("Binary files {old_header} and {new_header} differ\n"),
    }
}

fn as_text(side: &Side) -> Option<String> {
    match side {
        Side::Missing => Some(String::new()),
        Side::Text(text) => Some(text.clone()),
        Side::Link(target) => Some(format!("-> {}\n", target.display())),
        Side::Binary(_) => None,
    }
}
