use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// The workflow template failed to parse or render.
    #[error("workflow template: {0}")]
    Tera(#[from] tera::Error),

    #[error("could not build workflow context: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading an override template failed for a reason other than absence.
    #[error("cannot read workflow template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
