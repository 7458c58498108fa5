//! `repomirror workflow`: render the CI job definition from the config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use repomirror_core::config;
use repomirror_renderer::{TemplateEngine, TemplateOrigin, WorkflowContext, WORKFLOW_PATH};
use repomirror_sync::{atomic_write, git::Git, WriteResult};

/// Arguments for `repomirror workflow`.
#[derive(Args, Debug)]
pub struct WorkflowArgs {
    /// Job config file. The repository root is the git work tree holding it.
    #[arg(long, short = 'c', default_value = config::CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Output file. Defaults to `.github/workflows/mirror.yml` under the repository root.
    #[arg(long, short = 'o', conflicts_with = "stdout")]
    pub output: Option<PathBuf>,

    /// Directory holding a `workflow/mirror.yml.tera` override.
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,

    /// Print the workflow instead of writing it.
    #[arg(long)]
    pub stdout: bool,

    /// Show whether the file would change without writing it.
    #[arg(long)]
    pub dry_run: bool,

    /// Command the job runs to install repomirror.
    #[arg(long, value_name = "CMD")]
    pub install_command: Option<String>,
}

impl WorkflowArgs {
    pub fn run(self) -> Result<()> {
        let cfg = config::load_at(&self.config)
            .with_context(|| format!("failed to load '{}'", self.config.display()))?;

        let (root, config_ref) = locate_in_repository(&self.config)?;
        tracing::debug!(root = %root.display(), config = %config_ref, "resolved repository root");

        let engine = TemplateEngine::new(self.templates.as_deref())
            .context("failed to load workflow templates")?;
        if let TemplateOrigin::Override(path) = engine.origin() {
            tracing::info!(template = %path.display(), "rendering with template override");
        }
        let mut ctx = WorkflowContext::from_config(&cfg, &config_ref);
        if let Some(command) = self.install_command {
            ctx = ctx.with_install_command(command);
        }
        let content = engine.render(&ctx).context("failed to render workflow")?;

        if self.stdout {
            print!("{content}");
            return Ok(());
        }

        let output = self.output.unwrap_or_else(|| root.join(WORKFLOW_PATH));
        let result = atomic_write(&output, &content, self.dry_run)
            .with_context(|| format!("failed to write '{}'", output.display()))?;
        match result {
            WriteResult::Written { path } => println!("✎  {}", path.display()),
            WriteResult::WouldWrite { path } => println!("[dry-run] ~  {}", path.display()),
            WriteResult::Unchanged { path } => println!("·  {} (unchanged)", path.display()),
        }
        Ok(())
    }
}

/// Repository root for `config` and the config's path relative to it.
///
/// The root is the enclosing git work tree; outside one, the config's own
/// directory stands in.
fn locate_in_repository(config: &Path) -> Result<(PathBuf, String)> {
    let config = config
        .canonicalize()
        .with_context(|| format!("cannot resolve '{}'", config.display()))?;
    let dir = config.parent().unwrap_or_else(|| Path::new("."));
    let root = match Git::open(dir).run(&["rev-parse", "--show-toplevel"]) {
        Ok(top) => PathBuf::from(&top)
            .canonicalize()
            .with_context(|| format!("cannot resolve work tree '{top}'"))?,
        Err(_) => dir.to_path_buf(),
    };
    let relative = config.strip_prefix(&root).with_context(|| {
        format!(
            "'{}' is not inside repository '{}'",
            config.display(),
            root.display()
        )
    })?;
    let config_ref = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    Ok((root, config_ref))
}
