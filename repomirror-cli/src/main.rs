//! repomirror: one-way repository mirroring CLI.
//!
//! # Usage
//!
//! ```text
//! repomirror init [--path DIR] --target REPO [--source REPO] [--branch B] [--detect] [--force]
//! repomirror run [--config F] [--source-dir DIR] [--dry-run] [--push-retries N] [--json] [--report F]
//! repomirror plan <SOURCE_DIR> <TARGET_DIR> [--preserve NAME]... [--json]
//! repomirror sync <SOURCE_DIR> <TARGET_DIR> [--preserve NAME]... [--dry-run]
//! repomirror diff <SOURCE_DIR> <TARGET_DIR> [--preserve NAME]...
//! repomirror workflow [--config F] [--output F] [--templates DIR] [--stdout]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    diff::DiffArgs, init::InitArgs, plan::PlanArgs, run::RunArgs, sync::SyncArgs,
    workflow::WorkflowArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "repomirror",
    version,
    about = "Mirror a development repository into a public one, one commit per push",
    long_about = None,
)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace). `RUST_LOG` wins when set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a `repomirror.yaml` job config.
    Init(InitArgs),

    /// Clone the target, mirror the source into it, commit and push.
    Run(RunArgs),

    /// Show what a mirror would do between two local trees.
    Plan(PlanArgs),

    /// Mirror one local tree into another (no git involved).
    Sync(SyncArgs),

    /// Show unified diff of what a mirror would change.
    Diff(DiffArgs),

    /// Render the CI workflow that runs `repomirror run` on every push.
    Workflow(WorkflowArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Run(args) => args.run(),
        Commands::Plan(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Workflow(args) => args.run(),
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
