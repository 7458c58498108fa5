//! Thin wrapper over the `git` binary.
//!
//! Push needs a subprocess anyway, so every operation shells out to `git` for
//! one consistent behaviour (hooks, LFS filters, credential helpers). Output
//! and command lines pass through [`AccessToken::redact`] before they reach a
//! log line or an error.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use repomirror_core::{AccessToken, CommitIdentity, CommitSha};

use crate::error::{io_err, SyncError};
use crate::remote::display_url;

/// A git working tree plus the secret to scrub from anything it prints.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
    secret: Option<AccessToken>,
}

impl Git {
    pub fn open(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            secret: None,
        }
    }

    /// Redact `secret` from every command line and stderr this handle reports.
    pub fn with_secret(mut self, secret: Option<AccessToken>) -> Self {
        self.secret = secret;
        self
    }

    // -----------------------------------------------------------------------
    // Checkout
    // -----------------------------------------------------------------------

    /// Clone `branch` of `url` into `dest` with full history.
    ///
    /// LFS smudging is skipped here; call [`Git::lfs_pull`] afterwards so a
    /// missing object surfaces as [`SyncError::Lfs`].
    pub fn clone_branch(
        url: &str,
        branch: &str,
        dest: &Path,
        secret: Option<AccessToken>,
    ) -> Result<Self, SyncError> {
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        let runner = Git::open(parent).with_secret(secret.clone());

        let dest_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dest.to_string_lossy().into_owned());
        let args = ["clone", "--branch", branch, "--", url, dest_name.as_str()];
        let output = runner.output(&args, &[])?;
        if !output.status.success() {
            let stderr = runner.redact(&String::from_utf8_lossy(&output.stderr));
            if is_auth_failure(&stderr) {
                return Err(SyncError::Authentication {
                    remote: display_url(url),
                });
            }
            return Err(runner.failure(&args, stderr));
        }

        tracing::debug!(remote = %display_url(url), branch, "cloned target");
        Ok(Git::open(dest).with_secret(secret))
    }

    pub fn is_repository(&self) -> bool {
        self.run(&["rev-parse", "--is-inside-work-tree"])
            .map(|out| out == "true")
            .unwrap_or(false)
    }

    pub fn is_shallow(&self) -> Result<bool, SyncError> {
        Ok(self.run(&["rev-parse", "--is-shallow-repository"])? == "true")
    }

    pub fn head(&self) -> Result<CommitSha, SyncError> {
        Ok(self.run(&["rev-parse", "HEAD"])?.parse()?)
    }

    /// URL of remote `name`, or `None` if it is not configured.
    pub fn remote_url(&self, name: &str) -> Result<Option<String>, SyncError> {
        let output = self.output(&["remote", "get-url", name], &[])?;
        if output.status.success() {
            Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
        } else {
            Ok(None)
        }
    }

    pub fn set_remote_url(&self, name: &str, url: &str) -> Result<(), SyncError> {
        self.run(&["remote", "set-url", name, url]).map(|_| ())
    }

    /// Materialize LFS objects for the checked-out revision.
    pub fn lfs_pull(&self) -> Result<(), SyncError> {
        let output = self.output(&["lfs", "pull"], &[])?;
        if !output.status.success() {
            return Err(SyncError::Lfs {
                path: self.workdir.clone(),
                stderr: self.redact(&String::from_utf8_lossy(&output.stderr)).trim().to_string(),
            });
        }
        tracing::debug!(path = %self.workdir.display(), "lfs objects pulled");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Commit and publish
    // -----------------------------------------------------------------------

    pub fn stage_all(&self) -> Result<(), SyncError> {
        self.run(&["add", "-A"])?;
        tracing::debug!(path = %self.workdir.display(), "staged all changes");
        Ok(())
    }

    /// `true` when the index differs from HEAD.
    pub fn has_staged_changes(&self) -> Result<bool, SyncError> {
        let args = ["diff", "--cached", "--quiet"];
        let output = self.output(&args, &[])?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => {
                let stderr = self.redact(&String::from_utf8_lossy(&output.stderr));
                Err(self.failure(&args, stderr))
            }
        }
    }

    /// Commit the index as `identity` (author and committer) and return the new HEAD.
    pub fn commit(&self, message: &str, identity: &CommitIdentity) -> Result<CommitSha, SyncError> {
        let envs = [
            ("GIT_AUTHOR_NAME", identity.name.as_str()),
            ("GIT_AUTHOR_EMAIL", identity.email.as_str()),
            ("GIT_COMMITTER_NAME", identity.name.as_str()),
            ("GIT_COMMITTER_EMAIL", identity.email.as_str()),
        ];
        let args = [
            "-c",
            "commit.gpgsign=false",
            "commit",
            "--no-verify",
            "--quiet",
            "-m",
            message,
        ];
        let output = self.output(&args, &envs)?;
        if !output.status.success() {
            let stderr = self.redact(&String::from_utf8_lossy(&output.stderr));
            return Err(self.failure(&args, stderr));
        }
        let sha = self.head()?;
        tracing::debug!(path = %self.workdir.display(), sha = %sha, "created commit");
        Ok(sha)
    }

    /// Push HEAD to `refs/heads/<branch>` on `url`. Never forces.
    pub fn push(&self, url: &str, branch: &str) -> Result<(), SyncError> {
        let refspec = format!("HEAD:refs/heads/{branch}");
        let args = ["push", "--atomic", "--porcelain", url, refspec.as_str()];
        let output = self.output(&args, &[])?;
        if output.status.success() {
            return Ok(());
        }

        // --porcelain reports ref status on stdout; rejections show up there.
        let report = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let report = self.redact(&report).trim().to_string();
        if is_push_rejection(&report) {
            return Err(SyncError::PushRejected {
                branch: branch.to_string(),
                stderr: report,
            });
        }
        if is_auth_failure(&report) {
            return Err(SyncError::Authentication {
                remote: display_url(url),
            });
        }
        Err(self.failure(&args, report))
    }

    // -----------------------------------------------------------------------
    // Subprocess plumbing
    // -----------------------------------------------------------------------

    /// Run and return trimmed stdout, failing on a non-zero exit.
    pub fn run(&self, args: &[&str]) -> Result<String, SyncError> {
        let output = self.output(args, &[])?;
        if !output.status.success() {
            let stderr = self.redact(&String::from_utf8_lossy(&output.stderr));
            return Err(self.failure(args, stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn output(&self, args: &[&str], envs: &[(&str, &str)]) -> Result<Output, SyncError> {
        tracing::debug!(cwd = %self.workdir.display(), "git {}", self.redact(&args.join(" ")));
        Command::new("git")
            .args(args)
            .envs(envs.iter().copied())
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_LFS_SKIP_SMUDGE", "1")
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| io_err(&self.workdir, e))
    }

    fn failure(&self, args: &[&str], stderr: String) -> SyncError {
        SyncError::Git {
            command: self.redact(&args.join(" ")),
            stderr: self.redact(stderr.trim()),
        }
    }

    fn redact(&self, text: &str) -> String {
        match &self.secret {
            Some(secret) => secret.redact(text),
            None => text.to_string(),
        }
    }
}

fn is_auth_failure(stderr: &str) -> bool {
    const NEEDLES: &[&str] = &[
        "authentication failed",
        "could not read username",
        "could not read password",
        "permission denied",
        "returned error: 403",
        "returned error: 401",
        "invalid username or password",
        "terminal prompts disabled",
    ];
    let lower = stderr.to_ascii_lowercase();
    NEEDLES.iter().any(|n| lower.contains(n))
}

/// A ref refused because the remote moved on, as opposed to a server-side
/// policy (`[remote rejected]`: hooks, branch protection), which no retry fixes.
fn is_push_rejection(report: &str) -> bool {
    const RACE_STATUSES: &[&str] = &["[rejected]", "non-fast-forward", "fetch first", "stale info"];
    let lower = report.to_ascii_lowercase();
    if lower.contains("[remote rejected]") {
        return false;
    }
    RACE_STATUSES.iter().any(|n| lower.contains(n))
}
