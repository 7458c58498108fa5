//! `repomirror sync <SOURCE> <TARGET>`: mirror one local tree into another.

use anyhow::{Context, Result};
use clap::Args;

use repomirror_sync::{apply_plan, compute_plan, ChangeResult};

use super::TreeArgs;

/// Arguments for `repomirror sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub trees: TreeArgs,

    /// Show what would change without touching the target.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let allow = self.trees.allow_list()?;
        let (source, target) = (&self.trees.source, &self.trees.target);
        let plan = compute_plan(source, target, &allow)
            .with_context(|| format!("failed to plan '{}' -> '{}'", source.display(), target.display()))?;
        let results = apply_plan(&plan, source, target, self.dry_run)
            .with_context(|| format!("sync failed for '{}'", target.display()))?;

        print_results(&target.display().to_string(), &results, self.dry_run);
        Ok(())
    }
}

pub fn print_results(target: &str, results: &[ChangeResult], dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let changed = results
        .iter()
        .filter(|r| !matches!(r, ChangeResult::Untouched { .. }))
        .count();

    if changed == 0 {
        println!("{prefix}✓ '{target}' — nothing to do");
        return;
    }

    println!(
        "{prefix}✓ '{target}' mirrored ({changed} changed, {} untouched)",
        results.len() - changed
    );

    for r in results {
        let name = r.name().to_string_lossy();
        match r {
            ChangeResult::Applied { action, .. } => println!("  ✎  {name} ({action})"),
            ChangeResult::WouldApply { action, .. } => println!("  ~  {name} ({action})"),
            ChangeResult::Untouched { action, .. } => println!("  ·  {name} ({action})"),
        }
    }
}
