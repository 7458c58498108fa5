//! End-to-end mirror runs against local bare repositories.
//!
//! Every test drives the real `git` binary; the "remote" is a bare repo on
//! disk so no network or token is involved.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use repomirror_core::{CommitSha, MirrorConfig};
use repomirror_sync::git::Git;
use repomirror_sync::pipeline::{self, MirrorOutcome, MirrorRequest};
use repomirror_sync::{EntryAction, SyncError};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn git(cwd: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=Fixture", "-c", "user.email=fixture@example.com"])
        .args(["-c", "commit.gpgsign=false", "-c", "init.defaultBranch=main"])
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

struct Fixture {
    _root: TempDir,
    bare: PathBuf,
    source: PathBuf,
    scratch: PathBuf,
}

impl Fixture {
    /// Target `main` holds README.md and stale.txt; source `dev` holds
    /// core/, tools/ and its own README.md.
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let bare = root.path().join("public.git");
        let seed = root.path().join("seed");
        let source = root.path().join("source");
        let scratch = root.path().join("scratch");

        fs::create_dir_all(&bare).unwrap();
        git(&bare, &["init", "--bare", "-q"]);
        git(&bare, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        fs::create_dir_all(&seed).unwrap();
        git(&seed, &["init", "-q"]);
        git(&seed, &["checkout", "-q", "-B", "main"]);
        write(&seed, "README.md", "# public readme\n");
        write(&seed, "stale.txt", "old\n");
        git(&seed, &["add", "-A"]);
        git(&seed, &["commit", "-q", "-m", "seed"]);
        git(&seed, &["push", "-q", bare.to_str().unwrap(), "HEAD:refs/heads/main"]);

        fs::create_dir_all(&source).unwrap();
        git(&source, &["init", "-q"]);
        git(&source, &["checkout", "-q", "-B", "dev"]);
        write(&source, "README.md", "# private readme\n");
        write(&source, "core/lib.txt", "core v1\n");
        write(&source, "tools/build.sh", "#!/bin/sh\necho build\n");
        git(&source, &["add", "-A"]);
        git(&source, &["commit", "-q", "-m", "dev work"]);

        Self {
            _root: root,
            bare,
            source,
            scratch,
        }
    }

    fn request(&self) -> MirrorRequest {
        let mut config = MirrorConfig::new("acme/public".parse().unwrap());
        config.target.url = Some(self.bare.to_string_lossy().into_owned());
        config.source.lfs = false;
        let sha: CommitSha = git(&self.source, &["rev-parse", "HEAD"]).parse().unwrap();
        MirrorRequest {
            config,
            source_dir: self.source.clone(),
            source_repo: "acme/dev".parse().unwrap(),
            source_sha: sha,
            token: None,
            dry_run: false,
            keep_workdir: None,
            push_retries: None,
        }
    }

    fn target_head(&self) -> String {
        git(&self.bare, &["rev-parse", "refs/heads/main"])
    }

    /// Fresh clone of the target's `main` for inspecting its tree.
    fn checkout_target(&self) -> PathBuf {
        if self.scratch.exists() {
            fs::remove_dir_all(&self.scratch).unwrap();
        }
        let parent = self.scratch.parent().unwrap();
        git(
            parent,
            &["clone", "-q", "--branch", "main", self.bare.to_str().unwrap(), "scratch"],
        );
        self.scratch.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn mirrors_source_into_a_single_commit() {
    let fx = Fixture::new();
    let before = fx.target_head();
    let request = fx.request();

    let run = pipeline::run(&request).unwrap();

    let MirrorOutcome::Committed { commit, parent } = &run.outcome else {
        panic!("expected a commit, got {:?}", run.outcome);
    };
    assert_eq!(parent.as_str(), before);
    assert_eq!(commit.as_str(), fx.target_head());
    assert_eq!(run.attempts, 1);
    assert_eq!(run.plan.action_for("stale.txt"), Some(EntryAction::Remove));
    assert_eq!(run.plan.action_for("core"), Some(EntryAction::Add));
    assert_eq!(run.plan.action_for("README.md"), Some(EntryAction::Preserved));

    let count = git(&fx.bare, &["rev-list", "--count", &format!("{before}..main")]);
    assert_eq!(count, "1", "exactly one mirror commit expected");

    let message = git(&fx.bare, &["log", "-1", "--format=%s", "main"]);
    assert_eq!(
        message,
        format!("Update from acme/dev@{}", request.source_sha)
    );
    let author = git(&fx.bare, &["log", "-1", "--format=%an <%ae>", "main"]);
    assert_eq!(
        author,
        "github-actions[bot] <41898282+github-actions[bot]@users.noreply.github.com>"
    );

    let tree = fx.checkout_target();
    assert_eq!(
        fs::read_to_string(tree.join("README.md")).unwrap(),
        "# public readme\n"
    );
    assert!(!tree.join("stale.txt").exists());
    assert_eq!(
        fs::read_to_string(tree.join("core/lib.txt")).unwrap(),
        "core v1\n"
    );
    assert!(tree.join("tools/build.sh").exists());
}

#[test]
fn second_run_without_source_changes_is_a_noop() {
    let fx = Fixture::new();
    let request = fx.request();
    pipeline::run(&request).unwrap();
    let head = fx.target_head();

    let run = pipeline::run(&request).unwrap();

    assert!(
        matches!(&run.outcome, MirrorOutcome::NoChanges { target_head } if target_head.as_str() == head),
        "got {:?}",
        run.outcome
    );
    assert!(!run.plan.has_changes());
    assert_eq!(fx.target_head(), head, "no-op run must not push");
}

#[test]
fn source_update_replaces_only_changed_entries() {
    let fx = Fixture::new();
    pipeline::run(&fx.request()).unwrap();

    write(&fx.source, "core/lib.txt", "core v2\n");
    git(&fx.source, &["commit", "-q", "-am", "bump core"]);
    let run = pipeline::run(&fx.request()).unwrap();

    assert!(matches!(run.outcome, MirrorOutcome::Committed { .. }));
    assert_eq!(run.plan.action_for("core"), Some(EntryAction::Replace));
    assert_eq!(run.plan.action_for("tools"), Some(EntryAction::Unchanged));
    let tree = fx.checkout_target();
    assert_eq!(
        fs::read_to_string(tree.join("core/lib.txt")).unwrap(),
        "core v2\n"
    );
}

#[test]
fn dry_run_leaves_target_untouched() {
    let fx = Fixture::new();
    let before = fx.target_head();
    let mut request = fx.request();
    request.dry_run = true;

    let run = pipeline::run(&request).unwrap();

    assert!(matches!(run.outcome, MirrorOutcome::DryRun { .. }));
    assert!(run.plan.has_changes());
    assert_eq!(fx.target_head(), before);
}

#[test]
fn kept_workdir_holds_the_mirrored_clone() {
    let fx = Fixture::new();
    let keep = TempDir::new().unwrap();
    let mut request = fx.request();
    request.keep_workdir = Some(keep.path().to_path_buf());

    pipeline::run(&request).unwrap();

    let clone = keep.path().join("target");
    assert!(clone.join("core/lib.txt").exists());
    assert!(!clone.join("stale.txt").exists());
    let origin = Git::open(&clone).remote_url("origin").unwrap();
    assert_eq!(origin.as_deref(), fx.bare.to_str());
}

#[test]
fn shallow_source_is_rejected() {
    let fx = Fixture::new();
    let shallow_parent = TempDir::new().unwrap();
    let url = format!("file://{}", fx.source.display());
    git(
        shallow_parent.path(),
        &["clone", "-q", "--depth", "1", "--branch", "dev", &url, "shallow"],
    );
    let mut request = fx.request();
    request.source_dir = shallow_parent.path().join("shallow");

    let err = pipeline::run(&request).unwrap_err();

    assert!(matches!(err, SyncError::Shallow { .. }), "got {err:?}");
}

#[test]
fn non_repository_source_is_rejected() {
    let fx = Fixture::new();
    let plain = TempDir::new().unwrap();
    write(plain.path(), "file.txt", "x");
    let mut request = fx.request();
    request.source_dir = plain.path().to_path_buf();

    let err = pipeline::run(&request).unwrap_err();

    assert!(matches!(err, SyncError::NotARepository { .. }), "got {err:?}");
}

#[test]
fn https_target_without_token_fails_before_cloning() {
    let fx = Fixture::new();
    let mut request = fx.request();
    request.config.target.url = None;

    let err = pipeline::run(&request).unwrap_err();

    assert!(
        matches!(&err, SyncError::MissingCredential { env } if env == "MIRROR_REPO_TOKEN"),
        "got {err:?}"
    );
}

#[test]
fn concurrent_update_rejects_the_push() {
    let fx = Fixture::new();
    let work = TempDir::new().unwrap();
    let dest = work.path().join("clone");
    let url = fx.bare.to_string_lossy().into_owned();
    let clone = Git::clone_branch(&url, "main", &dest, None).unwrap();

    // Someone else moves main after our clone.
    let other = work.path().join("other");
    git(work.path(), &["clone", "-q", "--branch", "main", &url, "other"]);
    write(&other, "race.txt", "first\n");
    git(&other, &["add", "-A"]);
    git(&other, &["commit", "-q", "-m", "race"]);
    git(&other, &["push", "-q", "origin", "HEAD:refs/heads/main"]);
    let moved = fx.target_head();

    write(&dest, "mine.txt", "second\n");
    clone.stage_all().unwrap();
    assert!(clone.has_staged_changes().unwrap());
    clone
        .commit("local change", &Default::default())
        .unwrap();
    let err = clone.push(&url, "main").unwrap_err();

    assert!(matches!(err, SyncError::PushRejected { .. }), "got {err:?}");
    assert_eq!(fx.target_head(), moved, "rejected push must not move the branch");
}

#[test]
fn kept_workdir_inside_source_is_refused() {
    let fx = Fixture::new();
    let mut request = fx.request();
    request.keep_workdir = Some(fx.source.join("work"));

    let err = pipeline::run(&request).unwrap_err();

    assert!(matches!(err, SyncError::WorkdirInsideSource { .. }), "got {err:?}");
    assert!(!fx.source.join("work").exists());
}
