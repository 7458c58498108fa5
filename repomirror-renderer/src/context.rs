//! Template context: serializable rendering payload built from [`MirrorConfig`].

use serde::{Deserialize, Serialize};

use repomirror_core::MirrorConfig;

use crate::error::RenderError;

/// Install step used when the caller does not supply one.
pub const DEFAULT_INSTALL_COMMAND: &str = "cargo install --locked repomirror-cli";

/// Flat rendering payload for the workflow template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowContext {
    /// Value of the workflow's `name:` key.
    pub workflow_name: String,
    /// Push to this branch triggers the job.
    pub source_branch: String,
    pub target_repository: String,
    pub target_branch: String,
    /// Env var the job exports the token as; also the secret's name.
    pub token_env: String,
    /// `lfs:` input of the checkout step.
    pub lfs: bool,
    /// Config path as seen from the repository root.
    pub config_path: String,
    pub install_command: String,
    pub meta: MetaCtx,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaCtx {
    pub repomirror_version: String,
}

impl WorkflowContext {
    /// Build a [`WorkflowContext`] from a [`MirrorConfig`].
    ///
    /// `config_path` is written into the `repomirror run --config` step
    /// verbatim, so pass it relative to the repository root.
    pub fn from_config(config: &MirrorConfig, config_path: &str) -> Self {
        WorkflowContext {
            workflow_name: format!("Mirror to {}", config.target.repository),
            source_branch: config.source.branch.clone(),
            target_repository: config.target.repository.to_string(),
            target_branch: config.target.branch.clone(),
            token_env: config.target.token_env.clone(),
            lfs: config.source.lfs,
            config_path: config_path.replace('\\', "/"),
            install_command: DEFAULT_INSTALL_COMMAND.to_string(),
            meta: MetaCtx {
                repomirror_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Replace the install step's command.
    pub fn with_install_command(mut self, command: impl Into<String>) -> Self {
        self.install_command = command.into();
        self
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MirrorConfig {
        let mut cfg = MirrorConfig::new("acme/public".parse().unwrap());
        cfg.source.branch = "develop".to_string();
        cfg.target.token_env = "PUBLIC_MIRROR_TOKEN".to_string();
        cfg
    }

    #[test]
    fn context_fields_populated() {
        let ctx = WorkflowContext::from_config(&config(), "repomirror.yaml");
        assert_eq!(ctx.workflow_name, "Mirror to acme/public");
        assert_eq!(ctx.source_branch, "develop");
        assert_eq!(ctx.target_repository, "acme/public");
        assert_eq!(ctx.target_branch, "main");
        assert_eq!(ctx.token_env, "PUBLIC_MIRROR_TOKEN");
        assert!(ctx.lfs);
        assert_eq!(ctx.install_command, DEFAULT_INSTALL_COMMAND);
    }

    #[test]
    fn windows_separators_are_normalised() {
        let ctx = WorkflowContext::from_config(&config(), r"ci\repomirror.yaml");
        assert_eq!(ctx.config_path, "ci/repomirror.yaml");
    }

    #[test]
    fn to_tera_context_succeeds() {
        let ctx = WorkflowContext::from_config(&config(), "repomirror.yaml");
        ctx.to_tera_context().expect("context conversion");
    }
}
