pub mod diff;
pub mod init;
pub mod plan;
pub mod run;
pub mod sync;
pub mod workflow;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use repomirror_core::AllowList;

/// Source and target trees shared by `plan`, `sync` and `diff`.
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Tree to mirror from.
    pub source: PathBuf,

    /// Tree to mirror into.
    pub target: PathBuf,

    /// Extra top-level target name to keep (repeatable). `.git` and
    /// `README.md` are always kept.
    #[arg(long = "preserve", value_name = "NAME")]
    pub preserve: Vec<String>,
}

impl TreeArgs {
    pub fn allow_list(&self) -> Result<AllowList> {
        for name in &self.preserve {
            if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
                bail!("--preserve '{name}' must be a single top-level name");
            }
        }
        Ok(AllowList::with_extra(self.preserve.iter().cloned()))
    }
}
