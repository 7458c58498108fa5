//! Machine-readable run report.
//!
//! Printed by `repomirror run --json` and written by `--report <path>` using
//! the same atomic `.tmp` + rename pattern as the config file.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::digest::EntryKind;
use crate::error::{io_err, SyncError};
use crate::pipeline::{MirrorOutcome, MirrorRequest, MirrorRun};
use crate::plan::{EntryAction, MirrorPlan};

/// Serialized summary of one `repomirror run`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RunReport {
    pub source: String,
    pub source_sha: String,
    pub target: String,
    pub branch: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: OutcomeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    pub target_head: String,
    pub attempts: u32,
    pub summary: PlanSummary,
    pub entries: Vec<ReportEntry>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    NoChanges,
    Committed,
    DryRun,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PlanSummary {
    pub add: usize,
    pub replace: usize,
    pub remove: usize,
    pub unchanged: usize,
    pub preserved: usize,
}

impl PlanSummary {
    pub fn from_plan(plan: &MirrorPlan) -> Self {
        Self {
            add: plan.count(EntryAction::Add),
            replace: plan.count(EntryAction::Replace),
            remove: plan.count(EntryAction::Remove),
            unchanged: plan.count(EntryAction::Unchanged),
            preserved: plan.count(EntryAction::Preserved),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReportEntry {
    pub name: String,
    pub kind: EntryKind,
    pub action: EntryAction,
}

impl ReportEntry {
    /// One entry per top-level name, in plan order.
    pub fn from_plan(plan: &MirrorPlan) -> Vec<Self> {
        plan.entries
            .iter()
            .map(|e| ReportEntry {
                name: e.name.to_string_lossy().into_owned(),
                kind: e.kind,
                action: e.action,
            })
            .collect()
    }
}

impl RunReport {
    pub fn new(
        request: &MirrorRequest,
        run: &MirrorRun,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let (outcome, commit, target_head) = match &run.outcome {
            MirrorOutcome::NoChanges { target_head } => {
                (OutcomeKind::NoChanges, None, target_head.to_string())
            }
            MirrorOutcome::Committed { commit, parent } => (
                OutcomeKind::Committed,
                Some(commit.to_string()),
                parent.to_string(),
            ),
            MirrorOutcome::DryRun { target_head } => {
                (OutcomeKind::DryRun, None, target_head.to_string())
            }
        };

        Self {
            source: request.source_repo.to_string(),
            source_sha: request.source_sha.to_string(),
            target: request.config.target.repository.to_string(),
            branch: request.config.target.branch.clone(),
            started_at,
            finished_at,
            outcome,
            commit,
            target_head,
            attempts: run.attempts,
            summary: PlanSummary::from_plan(&run.plan),
            entries: ReportEntry::from_plan(&run.plan),
        }
    }
}

/// Save `report` as pretty JSON at `path` atomically.
pub fn save_at(path: &Path, report: &RunReport) -> Result<(), SyncError> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let json = serde_json::to_string_pretty(report)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}
