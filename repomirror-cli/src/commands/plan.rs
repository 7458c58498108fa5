//! `repomirror plan <SOURCE> <TARGET>`: show per-entry mirror actions.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use repomirror_sync::{
    compute_plan,
    report::{PlanSummary, ReportEntry},
    EntryAction, MirrorPlan,
};

use super::TreeArgs;

/// Arguments for `repomirror plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub trees: TreeArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct PlanJson {
    summary: PlanSummary,
    entries: Vec<ReportEntry>,
}

#[derive(Tabled)]
struct PlanTableRow {
    #[tabled(rename = "")]
    marker: String,
    #[tabled(rename = "entry")]
    entry: String,
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "action")]
    action: String,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let allow = self.trees.allow_list()?;
        let plan = compute_plan(&self.trees.source, &self.trees.target, &allow).with_context(|| {
            format!(
                "failed to plan '{}' -> '{}'",
                self.trees.source.display(),
                self.trees.target.display()
            )
        })?;

        if self.json {
            let payload = PlanJson {
                summary: PlanSummary::from_plan(&plan),
                entries: ReportEntry::from_plan(&plan),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize plan JSON")?
            );
            return Ok(());
        }

        print_plan(&plan);
        Ok(())
    }
}

/// Summary line plus one table row per top-level entry.
pub fn print_plan(plan: &MirrorPlan) {
    let s = PlanSummary::from_plan(plan);
    println!(
        "{} add | {} replace | {} remove | {} unchanged | {} preserved",
        s.add, s.replace, s.remove, s.unchanged, s.preserved
    );

    if plan.entries.is_empty() {
        println!("Both trees are empty.");
        return;
    }

    let rows: Vec<PlanTableRow> = plan
        .entries
        .iter()
        .map(|e| PlanTableRow {
            marker: action_indicator(e.action),
            entry: e.display_name(),
            kind: format!("{:?}", e.kind).to_lowercase(),
            action: e.action.to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn action_indicator(action: EntryAction) -> String {
    match action {
        EntryAction::Add => "+".green().bold().to_string(),
        EntryAction::Replace => "~".yellow().bold().to_string(),
        EntryAction::Remove => "-".red().bold().to_string(),
        EntryAction::Unchanged => "·".bright_black().to_string(),
        EntryAction::Preserved => "■".cyan().to_string(),
    }
}
