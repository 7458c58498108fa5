//! `repomirror diff <SOURCE> <TARGET>`: show unified diffs for what a mirror would change.

use anyhow::{Context, Result};
use clap::Args;

use repomirror_sync::diff_trees;

use super::TreeArgs;

/// Arguments for `repomirror diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub trees: TreeArgs,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let allow = self.trees.allow_list()?;
        let diffs = diff_trees(&self.trees.source, &self.trees.target, &allow)
            .with_context(|| format!("diff failed for '{}'", self.trees.target.display()))?;

        if diffs.is_empty() {
            println!("No differences for '{}'.", self.trees.target.display());
            return Ok(());
        }

        for diff in diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }

        Ok(())
    }
}
