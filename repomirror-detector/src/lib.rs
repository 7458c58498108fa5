//! Checkout detection for `repomirror-detector`.
//!
//! `detect_checkout(path)` inspects a local git working tree and reports what
//! `repomirror init --detect` needs to pre-fill a config: the repository full
//! name behind `origin`, the checked-out branch, whether the tree uses LFS,
//! and whether the clone is shallow.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use repomirror_core::RepoFullName;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// What was found in a local checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedCheckout {
    /// `owner/name` parsed from the `origin` remote, if it has a known form.
    pub repository: Option<RepoFullName>,
    /// Checked-out branch; `None` on a detached HEAD.
    pub branch: Option<String>,
    /// `.gitattributes` routes at least one pattern through the LFS filter.
    pub uses_lfs: bool,
    /// History is truncated; a mirror run from this tree would be refused.
    pub shallow: bool,
}

/// Errors from checkout detection.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("'{path}' is not a git working tree")]
    NotARepository { path: PathBuf },

    #[error("git failed: {stderr}")]
    Git { stderr: String },
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Inspect the git checkout at `path`.
///
/// Returns `DetectError::NotARepository` if `path` is not inside a work tree.
pub fn detect_checkout(path: &Path) -> Result<DetectedCheckout, DetectError> {
    match git(path, &["rev-parse", "--is-inside-work-tree"]) {
        Ok(Some(out)) if out == "true" => {}
        Ok(_) | Err(DetectError::Git { .. }) => {
            return Err(DetectError::NotARepository {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(e),
    }

    let repository = git(path, &["remote", "get-url", "origin"])?
        .as_deref()
        .and_then(parse_remote_url);
    let branch = git(path, &["symbolic-ref", "--short", "-q", "HEAD"])?;
    let shallow = git(path, &["rev-parse", "--is-shallow-repository"])?.as_deref() == Some("true");
    let uses_lfs = detect_lfs(path)?;

    Ok(DetectedCheckout {
        repository,
        branch,
        uses_lfs,
        shallow,
    })
}

/// Extract `owner/name` from a git remote URL.
///
/// Accepts `https://host/owner/name(.git)`, `git@host:owner/name(.git)` and
/// `ssh://git@host(:port)/owner/name(.git)`. Returns `None` for anything else
/// (local paths, bundles, nested group paths).
pub fn parse_remote_url(url: &str) -> Option<RepoFullName> {
    let url = url.trim();
    let path = if let Some((scheme, rest)) = url.split_once("://") {
        // scheme://[userinfo@]host[:port]/owner/name
        if scheme == "file" {
            return None;
        }
        let (_, path) = rest.split_once('/')?;
        path
    } else if let Some((host, path)) = url.split_once(':') {
        // scp-like: [user@]host:owner/name
        if host.contains('/') || path.starts_with('/') {
            return None;
        }
        path
    } else {
        return None;
    };

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut parts = path.split('/');
    let (owner, name) = (parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    format!("{owner}/{name}").parse().ok()
}

// ---------------------------------------------------------------------------
// Detectors
// ---------------------------------------------------------------------------

fn detect_lfs(path: &Path) -> Result<bool, DetectError> {
    let root = git(path, &["rev-parse", "--show-toplevel"])?
        .map(PathBuf::from)
        .unwrap_or_else(|| path.to_path_buf());
    let file = root.join(".gitattributes");
    if !file.exists() {
        return Ok(false);
    }
    let content = fs::read_to_string(&file)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.starts_with('#'))
        .any(|l| l.split_whitespace().any(|attr| attr == "filter=lfs")))
}

/// Run `git` in `cwd`. Exit 0 gives `Some(stdout)`; exit 1 or 2 gives `None`
/// (the "not set" answer of `symbolic-ref -q` and `remote get-url`) except
/// for `rev-parse`, where any failure is an error.
fn git(cwd: &Path, args: &[&str]) -> Result<Option<String>, DetectError> {
    let output = Command::new("git")
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .current_dir(cwd)
        .output()?;
    match output.status.code() {
        Some(0) => Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string())),
        Some(1) | Some(2) if args[0] != "rev-parse" => Ok(None),
        _ => Err(DetectError::Git {
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
    }
}
