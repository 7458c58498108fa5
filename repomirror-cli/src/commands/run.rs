//! `repomirror run`: the CI job: clone target, mirror, commit, push.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use repomirror_core::{config, AccessToken, CommitSha, MirrorConfig, RepoFullName};
use repomirror_detector::detect_checkout;
use repomirror_sync::{
    git::Git,
    pipeline::{self, MirrorOutcome, MirrorRequest},
    report, RunReport,
};

use super::plan::print_plan;

/// Arguments for `repomirror run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Job config file.
    #[arg(long, short = 'c', default_value = config::CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Root of the source checkout.
    #[arg(long, default_value = ".")]
    pub source_dir: PathBuf,

    /// Source `owner/name` for the commit message. Falls back to
    /// `$GITHUB_REPOSITORY`, then the config, then the `origin` remote.
    #[arg(long, value_name = "REPO")]
    pub source_repo: Option<RepoFullName>,

    /// Source commit for the commit message. Falls back to `$GITHUB_SHA`,
    /// then the checkout's HEAD.
    #[arg(long, value_name = "SHA")]
    pub source_sha: Option<CommitSha>,

    /// Plan against the live target without committing or pushing.
    #[arg(long)]
    pub dry_run: bool,

    /// Fresh attempts after a rejected push (overrides `push.retries`).
    #[arg(long, value_name = "N")]
    pub push_retries: Option<u32>,

    /// Clone the target into `DIR/target` and leave it there. Must lie outside the source tree.
    #[arg(long, value_name = "DIR")]
    pub keep_workdir: Option<PathBuf>,

    /// Print the run report as JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Also write the run report as JSON to this file.
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let cfg = config::load_at(&self.config)
            .with_context(|| format!("failed to load '{}'", self.config.display()))?;
        let source_dir = self
            .source_dir
            .canonicalize()
            .with_context(|| format!("cannot resolve source dir '{}'", self.source_dir.display()))?;

        let source_repo = resolve_source_repo(self.source_repo, &cfg, &source_dir)?;
        let source_sha = match self.source_sha.or(env_parse("GITHUB_SHA")?) {
            Some(sha) => sha,
            None => Git::open(&source_dir)
                .head()
                .with_context(|| format!("cannot read HEAD of '{}'", source_dir.display()))?,
        };
        let token = std::env::var(&cfg.target.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(AccessToken::new);

        let request = MirrorRequest {
            config: cfg,
            source_dir,
            source_repo,
            source_sha,
            token,
            dry_run: self.dry_run,
            keep_workdir: self.keep_workdir,
            push_retries: self.push_retries,
        };

        let started = Utc::now();
        let run = pipeline::run(&request).with_context(|| {
            format!(
                "mirror into '{}' failed",
                request.config.target.repository
            )
        })?;
        let finished = Utc::now();
        let run_report = RunReport::new(&request, &run, started, finished);

        if let Some(path) = &self.report {
            report::save_at(path, &run_report)
                .with_context(|| format!("failed to write report '{}'", path.display()))?;
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&run_report).context("failed to serialize run report")?
            );
            return Ok(());
        }

        print_plan(&run.plan);
        let target = format!(
            "{}@{}",
            request.config.target.repository, request.config.target.branch
        );
        let changed = run.plan.changes().count();
        match &run.outcome {
            MirrorOutcome::Committed { commit, .. } => println!(
                "✓ Pushed {} to '{target}' ({changed} entries changed)",
                commit.short()
            ),
            MirrorOutcome::NoChanges { target_head } => println!(
                "✓ '{target}' at {} already mirrors {}@{} — nothing to commit",
                target_head.short(),
                request.source_repo,
                request.source_sha.short()
            ),
            MirrorOutcome::DryRun { target_head } => println!(
                "[dry-run] ✓ {changed} entries would change on '{target}' at {}",
                target_head.short()
            ),
        }
        if run.attempts > 1 {
            println!("  (succeeded on attempt {})", run.attempts);
        }
        Ok(())
    }
}

/// `--source-repo` → `$GITHUB_REPOSITORY` → config → `origin` remote.
fn resolve_source_repo(
    flag: Option<RepoFullName>,
    cfg: &MirrorConfig,
    source_dir: &std::path::Path,
) -> Result<RepoFullName> {
    if let Some(repo) = flag {
        return Ok(repo);
    }
    if let Some(repo) = env_parse("GITHUB_REPOSITORY")? {
        return Ok(repo);
    }
    if let Some(repo) = cfg.source.repository.clone() {
        return Ok(repo);
    }
    detect_checkout(source_dir)
        .with_context(|| format!("failed to inspect '{}'", source_dir.display()))?
        .repository
        .context("cannot determine the source repository; pass --source-repo or set source.repository")
}

/// Parse env var `name` if it is set and non-empty.
fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid ${name}")),
        _ => Ok(None),
    }
}
