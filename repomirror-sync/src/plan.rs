//! Top-level mirror plan.
//!
//! Every top-level name found on either side gets exactly one action:
//!
//! | Source | Target | Allow-listed | Action      |
//! |--------|--------|--------------|-------------|
//! | any    | any    | yes          | `Preserved` (target side only) |
//! | yes    | no     | no           | `Add`       |
//! | no     | yes    | no           | `Remove`    |
//! | yes    | yes    | no           | `Replace` if digests differ, else `Unchanged` |
//!
//! Allow-listed names on the source side are never copied.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use repomirror_core::AllowList;
use serde::Serialize;

use crate::digest::{self, EntryKind};
use crate::error::SyncError;

/// What the mirror will do with one top-level name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryAction {
    Add,
    Replace,
    Remove,
    Unchanged,
    Preserved,
}

impl EntryAction {
    /// `true` for actions that mutate the target tree.
    pub fn is_change(self) -> bool {
        matches!(self, Self::Add | Self::Replace | Self::Remove)
    }
}

impl fmt::Display for EntryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "add",
            Self::Replace => "replace",
            Self::Remove => "remove",
            Self::Unchanged => "unchanged",
            Self::Preserved => "preserved",
        };
        f.write_str(s)
    }
}

/// One row of a [`MirrorPlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    pub name: OsString,
    pub action: EntryAction,
    /// Source kind for `Add`/`Replace`/`Unchanged`, target kind otherwise.
    pub kind: EntryKind,
}

impl PlannedEntry {
    pub fn display_name(&self) -> String {
        let name = self.name.to_string_lossy();
        match self.kind {
            EntryKind::Dir => format!("{name}/"),
            _ => name.into_owned(),
        }
    }
}

/// Ordered (by name) set of top-level actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorPlan {
    pub entries: Vec<PlannedEntry>,
}

impl MirrorPlan {
    pub fn has_changes(&self) -> bool {
        self.entries.iter().any(|e| e.action.is_change())
    }

    pub fn count(&self, action: EntryAction) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }

    pub fn changes(&self) -> impl Iterator<Item = &PlannedEntry> {
        self.entries.iter().filter(|e| e.action.is_change())
    }

    pub fn action_for(&self, name: &str) -> Option<EntryAction> {
        self.entries
            .iter()
            .find(|e| e.name.to_str() == Some(name))
            .map(|e| e.action)
    }
}

/// Compare `source` and `target` top-level entries and decide what to do.
///
/// Reads both trees; writes nothing.
pub fn compute_plan(
    source: &Path,
    target: &Path,
    allow: &AllowList,
) -> Result<MirrorPlan, SyncError> {
    let source_names = listing(source)?;
    let target_names = listing(target)?;

    let mut sides: BTreeMap<OsString, (Option<PathBuf>, Option<PathBuf>)> = BTreeMap::new();
    for name in source_names {
        let path = source.join(&name);
        sides.entry(name).or_default().0 = Some(path);
    }
    for name in target_names {
        let path = target.join(&name);
        sides.entry(name).or_default().1 = Some(path);
    }

    let mut entries = Vec::with_capacity(sides.len());
    for (name, (src, dst)) in sides {
        let allowed = name.to_str().is_some_and(|n| allow.contains(n));
        let entry = match (allowed, src, dst) {
            (true, _, Some(dst)) => PlannedEntry {
                name,
                action: EntryAction::Preserved,
                kind: EntryKind::of(&dst)?,
            },
            (true, Some(_), None) => {
                tracing::debug!(
                    "skipping allow-listed source entry: {}",
                    name.to_string_lossy()
                );
                continue;
            }
            (false, Some(src), None) => PlannedEntry {
                name,
                action: EntryAction::Add,
                kind: EntryKind::of(&src)?,
            },
            (false, None, Some(dst)) => PlannedEntry {
                name,
                action: EntryAction::Remove,
                kind: EntryKind::of(&dst)?,
            },
            (false, Some(src), Some(dst)) => {
                let same = digest::entry_digest(&src)? == digest::entry_digest(&dst)?;
                PlannedEntry {
                    name,
                    action: if same {
                        EntryAction::Unchanged
                    } else {
                        EntryAction::Replace
                    },
                    kind: EntryKind::of(&src)?,
                }
            }
            (_, None, None) => continue,
        };
        entries.push(entry);
    }

    Ok(MirrorPlan { entries })
}

fn listing(dir: &Path) -> Result<Vec<OsString>, SyncError> {
    if !dir.is_dir() {
        return Err(crate::error::io_err(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }
    digest::sorted_children(dir)
}
