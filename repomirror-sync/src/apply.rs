//! Apply a [`MirrorPlan`] to a target tree.
//!
//! `Remove` and `Replace` entries are deleted from the target first, then
//! `Add` and `Replace` entries are copied from the source. `Unchanged` and
//! `Preserved` entries are never touched, so their mtimes survive.

use std::ffi::OsString;
use std::fs;
use std::path::Path;

use crate::digest::{self, EntryKind};
use crate::error::{io_err, SyncError};
use crate::plan::{EntryAction, MirrorPlan};

/// Outcome for one planned entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeResult {
    /// The target was mutated.
    Applied { name: OsString, action: EntryAction },
    /// `--dry-run` mode: the change *would* have been made.
    WouldApply { name: OsString, action: EntryAction },
    /// `Unchanged` or `Preserved`; nothing to do.
    Untouched { name: OsString, action: EntryAction },
}

impl ChangeResult {
    pub fn name(&self) -> &OsString {
        match self {
            Self::Applied { name, .. } | Self::WouldApply { name, .. } | Self::Untouched { name, .. } => {
                name
            }
        }
    }

    pub fn action(&self) -> EntryAction {
        match self {
            Self::Applied { action, .. }
            | Self::WouldApply { action, .. }
            | Self::Untouched { action, .. } => *action,
        }
    }
}

/// Make `target` mirror `source` according to `plan`.
pub fn apply_plan(
    plan: &MirrorPlan,
    source: &Path,
    target: &Path,
    dry_run: bool,
) -> Result<Vec<ChangeResult>, SyncError> {
    let mut results = Vec::with_capacity(plan.entries.len());

    for entry in &plan.entries {
        let name = entry.name.clone();
        let action = entry.action;
        if !action.is_change() {
            results.push(ChangeResult::Untouched { name, action });
            continue;
        }
        if dry_run {
            tracing::info!("[dry-run] would {action}: {}", entry.display_name());
            results.push(ChangeResult::WouldApply { name, action });
            continue;
        }

        let dst = target.join(&entry.name);
        if matches!(action, EntryAction::Remove | EntryAction::Replace) {
            remove_entry(&dst)?;
        }
        if matches!(action, EntryAction::Add | EntryAction::Replace) {
            copy_entry(&source.join(&entry.name), &dst)?;
        }
        tracing::info!("{action}: {}", entry.display_name());
        results.push(ChangeResult::Applied { name, action });
    }

    Ok(results)
}

/// Delete a file, symlink, or directory tree. Symlinks are removed, never followed.
pub(crate) fn remove_entry(path: &Path) -> Result<(), SyncError> {
    match EntryKind::of(path)? {
        EntryKind::Dir => fs::remove_dir_all(path).map_err(|e| io_err(path, e)),
        EntryKind::File | EntryKind::Symlink => fs::remove_file(path).map_err(|e| io_err(path, e)),
    }
}

/// Recursively copy `src` to `dst`, which must not exist.
///
/// Files keep their permission bits; symlinks are recreated as links.
pub(crate) fn copy_entry(src: &Path, dst: &Path) -> Result<(), SyncError> {
    match EntryKind::of(src)? {
        EntryKind::File => {
            fs::copy(src, dst).map_err(|e| io_err(dst, e))?;
        }
        EntryKind::Symlink => copy_symlink(src, dst)?,
        EntryKind::Dir => {
            fs::create_dir(dst).map_err(|e| io_err(dst, e))?;
            for name in digest::sorted_children(src)? {
                copy_entry(&src.join(&name), &dst.join(&name))?;
            }
            let perms = fs::metadata(src).map_err(|e| io_err(src, e))?.permissions();
            fs::set_permissions(dst, perms).map_err(|e| io_err(dst, e))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<(), SyncError> {
    let link = fs::read_link(src).map_err(|e| io_err(src, e))?;
    std::os::unix::fs::symlink(&link, dst).map_err(|e| io_err(dst, e))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> Result<(), SyncError> {
    // Without portable symlink creation, materialize the link's content.
    if fs::metadata(src).map_err(|e| io_err(src, e))?.is_dir() {
        fs::create_dir(dst).map_err(|e| io_err(dst, e))?;
        for name in digest::sorted_children(src)? {
            copy_entry(&src.join(&name), &dst.join(&name))?;
        }
        Ok(())
    } else {
        fs::copy(src, dst).map(|_| ()).map_err(|e| io_err(dst, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::compute_plan;
    use repomirror_core::AllowList;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn top_level(dir: &Path) -> BTreeSet<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    fn mirror(src: &Path, dst: &Path) -> Vec<ChangeResult> {
        let plan = compute_plan(src, dst, &AllowList::default()).unwrap();
        apply_plan(&plan, src, dst, false).unwrap()
    }

    #[test]
    fn scenario_core_tools_readme_against_stale_target() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(src.path(), "core/engine.rs", "engine");
        write(src.path(), "tools/lint.sh", "lint");
        write(src.path(), "README.md", "internal readme");
        write(dst.path(), ".git/HEAD", "ref: refs/heads/main\n");
        write(dst.path(), "README.md", "public readme");
        write(dst.path(), "stale.txt", "old");

        mirror(src.path(), dst.path());

        let expected: BTreeSet<String> = [".git", "README.md", "core", "tools"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(top_level(dst.path()), expected);
        assert_eq!(fs::read_to_string(dst.path().join("README.md")).unwrap(), "public readme");
        assert_eq!(
            fs::read_to_string(dst.path().join("core/engine.rs")).unwrap(),
            "engine"
        );
        assert_eq!(
            fs::read_to_string(dst.path().join(".git/HEAD")).unwrap(),
            "ref: refs/heads/main\n"
        );
    }

    #[test]
    fn replace_drops_files_missing_from_source_dir() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(src.path(), "core/keep.rs", "keep");
        write(dst.path(), "core/keep.rs", "old keep");
        write(dst.path(), "core/obsolete.rs", "obsolete");

        mirror(src.path(), dst.path());

        assert!(dst.path().join("core/keep.rs").exists());
        assert!(!dst.path().join("core/obsolete.rs").exists());
    }

    #[test]
    fn second_apply_is_a_noop() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(src.path(), "core/a.rs", "a");
        write(dst.path(), "old/b.rs", "b");

        mirror(src.path(), dst.path());
        let plan = compute_plan(src.path(), dst.path(), &AllowList::default()).unwrap();
        assert!(!plan.has_changes());
        let results = apply_plan(&plan, src.path(), dst.path(), false).unwrap();
        assert!(results
            .iter()
            .all(|r| matches!(r, ChangeResult::Untouched { .. })));
    }

    #[test]
    fn dry_run_leaves_target_alone() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(src.path(), "core/a.rs", "a");
        write(dst.path(), "stale.txt", "old");

        let plan = compute_plan(src.path(), dst.path(), &AllowList::default()).unwrap();
        let results = apply_plan(&plan, src.path(), dst.path(), true).unwrap();

        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| matches!(r, ChangeResult::WouldApply { .. })));
        assert!(dst.path().join("stale.txt").exists());
        assert!(!dst.path().join("core").exists());
    }

    #[test]
    #[cfg(unix)]
    fn copy_preserves_symlinks_and_exec_bit() {
        use std::os::unix::fs::PermissionsExt;

        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(src.path(), "bin/tool", "#!/bin/sh\n");
        fs::set_permissions(src.path().join("bin/tool"), fs::Permissions::from_mode(0o755))
            .unwrap();
        std::os::unix::fs::symlink("bin/tool", src.path().join("tool")).unwrap();

        mirror(src.path(), dst.path());

        let mode = fs::metadata(dst.path().join("bin/tool"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111);
        let link = fs::read_link(dst.path().join("tool")).unwrap();
        assert_eq!(link, Path::new("bin/tool"));
    }

    #[test]
    #[cfg(unix)]
    fn removing_a_symlinked_dir_does_not_follow_it() {
        let outside = TempDir::new().unwrap();
        write(outside.path(), "precious.txt", "keep me");
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dst.path().join("linked")).unwrap();

        mirror(src.path(), dst.path());

        assert!(!dst.path().join("linked").exists());
        assert!(outside.path().join("precious.txt").exists());
    }
}
