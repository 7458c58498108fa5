//! Workflow rendering on top of Tera.
//!
//! The default template is compiled into the binary. A template directory
//! passed to [`TemplateEngine::new`] may hold `workflow/mirror.yml.tera`, which
//! then replaces the embedded copy; other files in that directory are ignored.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tera::Tera;

use crate::context::WorkflowContext;
use crate::error::RenderError;

/// Template name, and the relative path an override must use.
pub const WORKFLOW_TEMPLATE: &str = "workflow/mirror.yml.tera";

/// Rendered workflow location relative to the repository root.
pub const WORKFLOW_PATH: &str = ".github/workflows/mirror.yml";

const EMBEDDED_WORKFLOW: &str = include_str!("templates/mirror.yml.tera");

/// Where the workflow template body came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOrigin {
    Embedded,
    Override(PathBuf),
}

/// Reads the override under `dir`, if there is one.
fn read_override(dir: &Path) -> Result<Option<(PathBuf, String)>, RenderError> {
    let path = WORKFLOW_TEMPLATE
        .split('/')
        .fold(dir.to_path_buf(), |acc, part| acc.join(part));
    match std::fs::read_to_string(&path) {
        Ok(body) => Ok(Some((path, body))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(RenderError::Io { path, source }),
    }
}

pub struct TemplateEngine {
    tera: Tera,
    origin: TemplateOrigin,
}

impl TemplateEngine {
    /// Compiles the workflow template, preferring an override in
    /// `template_dir`. A missing directory is not an error; a template that
    /// fails to parse is.
    pub fn new(template_dir: Option<&Path>) -> Result<Self, RenderError> {
        let found = match template_dir {
            Some(dir) => read_override(dir)?,
            None => None,
        };
        let (origin, body) = match found {
            Some((path, body)) => {
                tracing::debug!(path = %path.display(), "using workflow template override");
                (TemplateOrigin::Override(path), body)
            }
            None => (TemplateOrigin::Embedded, EMBEDDED_WORKFLOW.to_string()),
        };

        let mut tera = Tera::default();
        // Output is YAML, not HTML.
        tera.autoescape_on(vec![]);
        tera.add_raw_template(WORKFLOW_TEMPLATE, &body)?;
        Ok(Self { tera, origin })
    }

    pub fn origin(&self) -> &TemplateOrigin {
        &self.origin
    }

    /// Renders the workflow for `ctx` with LF line endings.
    pub fn render(&self, ctx: &WorkflowContext) -> Result<String, RenderError> {
        let rendered = self.tera.render(WORKFLOW_TEMPLATE, &ctx.to_tera_context()?)?;
        Ok(rendered.replace("\r\n", "\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use repomirror_core::MirrorConfig;

    fn rendered() -> String {
        let config = MirrorConfig::new("acme/public".parse().unwrap());
        TemplateEngine::new(None)
            .unwrap()
            .render(&WorkflowContext::from_config(&config, "repomirror.yaml"))
            .unwrap()
    }

    #[test]
    fn embedded_template_is_default() {
        let engine = TemplateEngine::new(None).unwrap();
        assert_eq!(engine.origin(), &TemplateOrigin::Embedded);
    }

    #[test]
    fn header_names_generator_version() {
        let body = rendered();
        let first = body.lines().next().unwrap();
        assert_eq!(
            first,
            format!(
                "# Generated by repomirror {} from repomirror.yaml.",
                env!("CARGO_PKG_VERSION")
            )
        );
    }

    #[test]
    fn actions_expressions_are_emitted_literally() {
        let body = rendered();
        assert!(
            body.contains("MIRROR_REPO_TOKEN: ${{ secrets.MIRROR_REPO_TOKEN }}"),
            "{body}"
        );
        assert!(!body.contains('\r'));
    }

    #[test]
    fn override_is_recorded_as_origin() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("workflow").join("mirror.yml.tera");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "name: {{ workflow_name }}\n").unwrap();

        let engine = TemplateEngine::new(Some(dir.path())).unwrap();
        assert_eq!(engine.origin(), &TemplateOrigin::Override(path));
    }
}
