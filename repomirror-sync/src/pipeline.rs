//! End-to-end mirror run shared by `repomirror run` and the integration tests.
//!
//! 1. Verify the source checkout (git work tree, full history, LFS content).
//! 2. Clone the target branch into an ephemeral directory (full history).
//! 3. Plan and apply the top-level mirror.
//! 4. Stage everything; stop here if the index matches HEAD.
//! 5. Commit once as the bot identity and push (`--atomic`, never forced).
//!
//! A rejected push fails the run unless `push.retries` allows another
//! attempt, which starts over from a fresh clone at the new target head.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use repomirror_core::{
    commit_message, AccessToken, CommitSha, MirrorConfig, RepoFullName,
};

use crate::apply::{apply_plan, ChangeResult};
use crate::error::{io_err, SyncError};
use crate::git::Git;
use crate::plan::{compute_plan, MirrorPlan};
use crate::remote::{authenticated_url, display_url};

/// Everything a run needs, resolved by the caller.
#[derive(Debug, Clone)]
pub struct MirrorRequest {
    pub config: MirrorConfig,
    /// Root of the source working tree.
    pub source_dir: PathBuf,
    pub source_repo: RepoFullName,
    pub source_sha: CommitSha,
    pub token: Option<AccessToken>,
    /// Plan only; nothing is committed or pushed.
    pub dry_run: bool,
    /// Clone the target here instead of a temporary directory and keep it.
    pub keep_workdir: Option<PathBuf>,
    /// Overrides `config.push.retries` when set.
    pub push_retries: Option<u32>,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// Target already mirrors the source; no commit, no push.
    NoChanges { target_head: CommitSha },
    /// One commit was created on top of `parent` and pushed.
    Committed { commit: CommitSha, parent: CommitSha },
    /// `--dry-run`: the plan was computed against `target_head` only.
    DryRun { target_head: CommitSha },
}

/// Result of [`run`].
#[derive(Debug, Clone)]
pub struct MirrorRun {
    pub outcome: MirrorOutcome,
    pub plan: MirrorPlan,
    pub changes: Vec<ChangeResult>,
    /// 1 unless a rejected push was retried.
    pub attempts: u32,
}

/// Run the mirror job described by `request`.
pub fn run(request: &MirrorRequest) -> Result<MirrorRun, SyncError> {
    let config = &request.config;
    let remote = config.target.remote_url();
    let push_url = authenticated_url(
        &remote,
        request.token.as_ref(),
        &config.target.token_env,
    )?;

    verify_source(request)?;
    if let Some(keep) = &request.keep_workdir {
        check_workdir_outside_source(keep, &request.source_dir)?;
    }

    let retries = request.push_retries.unwrap_or(config.push.retries);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match attempt_once(request, &push_url, attempt) {
            Err(SyncError::PushRejected { branch, stderr }) if attempt <= retries => {
                tracing::warn!(
                    attempt,
                    retries,
                    "push to '{branch}' rejected, starting over from a fresh clone: {stderr}"
                );
            }
            Err(err) => return Err(err),
            Ok(mut run) => {
                run.attempts = attempt;
                return Ok(run);
            }
        }
    }
}

fn verify_source(request: &MirrorRequest) -> Result<(), SyncError> {
    let source = Git::open(&request.source_dir);
    if !source.is_repository() {
        return Err(SyncError::NotARepository {
            path: request.source_dir.clone(),
        });
    }
    if source.is_shallow()? {
        return Err(SyncError::Shallow {
            path: request.source_dir.clone(),
        });
    }
    if request.config.source.lfs {
        source.lfs_pull()?;
    }
    Ok(())
}

fn check_workdir_outside_source(workdir: &Path, source_dir: &Path) -> Result<(), SyncError> {
    let source = source_dir
        .canonicalize()
        .map_err(|e| io_err(source_dir, e))?;
    let workdir_abs = resolve_lexically(workdir)?;
    if workdir_abs.starts_with(&source) {
        return Err(SyncError::WorkdirInsideSource {
            workdir: workdir.to_path_buf(),
            source_dir: source_dir.to_path_buf(),
        });
    }
    Ok(())
}

/// Canonical form of `path`, which need not exist yet: the deepest existing
/// ancestor is canonicalized and the missing tail appended.
fn resolve_lexically(path: &Path) -> Result<PathBuf, SyncError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|e| io_err(path, e))?;
        cwd.join(path)
    };
    let mut existing = absolute.as_path();
    let mut tail = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(base) => {
                return Ok(tail.iter().rev().fold(base, |acc: PathBuf, part| acc.join(part)));
            }
            Err(_) => match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    tail.push(name.to_os_string());
                    existing = parent;
                }
                _ => return Ok(absolute),
            },
        }
    }
}

fn attempt_once(
    request: &MirrorRequest,
    push_url: &str,
    attempt: u32,
) -> Result<MirrorRun, SyncError> {
    let config = &request.config;
    let branch = config.target.branch.as_str();
    let workspace = Workspace::create(request.keep_workdir.as_deref())?;
    let target_dir = workspace.target_dir();

    tracing::info!(
        attempt,
        target = %config.target.repository,
        remote = %display_url(&config.target.remote_url()),
        branch,
        "checking out target"
    );
    let target = Git::clone_branch(push_url, branch, &target_dir, request.token.clone())?;
    if config.source.lfs {
        target.lfs_pull()?;
    }
    // Keep the token out of the checkout's .git/config.
    target.set_remote_url("origin", &display_url(push_url))?;
    let target_head = target.head()?;

    let plan = compute_plan(&request.source_dir, &target_dir, &config.allow_list())?;
    tracing::info!(
        add = plan.count(crate::EntryAction::Add),
        replace = plan.count(crate::EntryAction::Replace),
        remove = plan.count(crate::EntryAction::Remove),
        unchanged = plan.count(crate::EntryAction::Unchanged),
        "mirror plan computed"
    );

    if request.dry_run {
        let changes = apply_plan(&plan, &request.source_dir, &target_dir, true)?;
        return Ok(MirrorRun {
            outcome: MirrorOutcome::DryRun { target_head },
            plan,
            changes,
            attempts: attempt,
        });
    }

    let changes = apply_plan(&plan, &request.source_dir, &target_dir, false)?;
    target.stage_all()?;
    if !target.has_staged_changes()? {
        tracing::info!(head = %target_head.short(), "no changes to mirror; nothing to commit");
        return Ok(MirrorRun {
            outcome: MirrorOutcome::NoChanges { target_head },
            plan,
            changes,
            attempts: attempt,
        });
    }

    let message = commit_message(&request.source_repo, &request.source_sha);
    let commit = target.commit(&message, &config.identity)?;
    target.push(push_url, branch)?;
    tracing::info!(
        commit = %commit.short(),
        parent = %target_head.short(),
        branch,
        "pushed mirror commit"
    );

    Ok(MirrorRun {
        outcome: MirrorOutcome::Committed {
            commit,
            parent: target_head,
        },
        plan,
        changes,
        attempts: attempt,
    })
}

/// Where the target clone lives for one attempt.
enum Workspace {
    Temp(TempDir),
    Kept(PathBuf),
}

impl Workspace {
    fn create(keep: Option<&Path>) -> Result<Self, SyncError> {
        match keep {
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("repomirror-")
                    .tempdir()
                    .map_err(|e| io_err(std::env::temp_dir(), e))?;
                Ok(Self::Temp(dir))
            }
            Some(dir) => {
                // A previous attempt's clone is stale by definition.
                let target = dir.join("target");
                if target.exists() {
                    std::fs::remove_dir_all(&target).map_err(|e| io_err(&target, e))?;
                }
                std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
                Ok(Self::Kept(dir.to_path_buf()))
            }
        }
    }

    fn target_dir(&self) -> PathBuf {
        match self {
            Self::Temp(dir) => dir.path().join("target"),
            Self::Kept(dir) => dir.join("target"),
        }
    }
}
