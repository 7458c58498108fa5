//! # repomirror-sync
//!
//! Plans, applies, and publishes a one-way repository mirror.
//!
//! Call [`pipeline::run`] for the full job (clone target, mirror, commit,
//! push), or [`compute_plan`] + [`apply_plan`] to mirror two local trees.

pub mod apply;
pub mod diff;
pub mod digest;
pub mod error;
pub mod git;
pub mod pipeline;
pub mod plan;
pub mod remote;
pub mod report;
pub mod writer;

pub use apply::{apply_plan, ChangeResult};
pub use diff::{diff_trees, FileDiff};
pub use digest::EntryKind;
pub use error::SyncError;
pub use pipeline::{MirrorOutcome, MirrorRequest, MirrorRun};
pub use plan::{compute_plan, EntryAction, MirrorPlan, PlannedEntry};
pub use report::RunReport;
pub use writer::{atomic_write, WriteResult};
