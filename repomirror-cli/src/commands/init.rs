//! `repomirror init [--path DIR] --target REPO [--source REPO] [--branch B] [--detect] [--force]`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use repomirror_core::{config, MirrorConfig, RepoFullName};
use repomirror_detector::detect_checkout;

/// Write a `repomirror.yaml` job config.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Source checkout root; the config is written here.
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Repository receiving the mirror, as `owner/name`.
    #[arg(long, short = 't', value_name = "REPO")]
    pub target: RepoFullName,

    /// Repository being mirrored, as `owner/name`.
    #[arg(long, short = 's', value_name = "REPO")]
    pub source: Option<RepoFullName>,

    /// Source branch whose pushes trigger the mirror.
    #[arg(long, short = 'b')]
    pub branch: Option<String>,

    /// Fill source repository, branch and LFS usage from the checkout at `--path`.
    #[arg(long)]
    pub detect: bool,

    /// Overwrite an existing config.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let root = self
            .path
            .canonicalize()
            .with_context(|| format!("cannot resolve path '{}'", self.path.display()))?;
        let config_path = config::default_path_in(&root);
        if config_path.exists() && !self.force {
            bail!(
                "'{}' already exists; pass --force to overwrite",
                config_path.display()
            );
        }

        let mut cfg = MirrorConfig::new(self.target);
        if self.detect {
            let detected = detect_checkout(&root)
                .with_context(|| format!("failed to inspect checkout at '{}'", root.display()))?;
            if detected.shallow {
                tracing::warn!(
                    "'{}' is a shallow clone; `repomirror run` needs full history",
                    root.display()
                );
            }
            cfg.source.repository = detected.repository;
            if let Some(branch) = detected.branch {
                cfg.source.branch = branch;
            }
            cfg.source.lfs = detected.uses_lfs;
        }
        if let Some(source) = self.source {
            cfg.source.repository = Some(source);
        }
        if let Some(branch) = self.branch {
            cfg.source.branch = branch;
        }

        config::save_at(&config_path, &cfg)
            .with_context(|| format!("failed to write '{}'", config_path.display()))?;

        println!(
            "✓ Mirroring '{}' ({}) into '{}' ({})",
            cfg.source
                .repository
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "<from environment>".to_string()),
            cfg.source.branch,
            cfg.target.repository,
            cfg.target.branch,
        );
        println!("  Saved to: {}", config_path.display());
        println!("  Next: `repomirror workflow` to generate the CI job");
        Ok(())
    }
}
