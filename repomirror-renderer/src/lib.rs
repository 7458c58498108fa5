//! # repomirror-renderer
//!
//! Tera-based template engine that renders the CI workflow definition which
//! triggers `repomirror run` on every push to the source branch.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use repomirror_core::MirrorConfig;
//! use repomirror_renderer::{TemplateEngine, WorkflowContext, WORKFLOW_PATH};
//!
//! fn render(config: &MirrorConfig) {
//!     if let Ok(engine) = TemplateEngine::new(None) {
//!         let ctx = WorkflowContext::from_config(config, "repomirror.yaml");
//!         if let Ok(content) = engine.render(&ctx) {
//!             println!("{}: {} bytes", Path::new(WORKFLOW_PATH).display(), content.len());
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::WorkflowContext;
pub use engine::{TemplateEngine, TemplateOrigin, WORKFLOW_PATH, WORKFLOW_TEMPLATE};
pub use error::RenderError;
