//! Error types for repomirror-sync.

use std::path::PathBuf;

use thiserror::Error;

use repomirror_core::ConfigError;

/// All errors that can arise from planning, applying, or publishing a mirror.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from job configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (run report).
    #[error("run report JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A git subprocess exited unsuccessfully. Credentials are already redacted.
    #[error("`git {command}` failed: {stderr}")]
    Git { command: String, stderr: String },

    /// The checkout lacks full history.
    #[error("{path} is a shallow clone; full history is required")]
    Shallow { path: PathBuf },

    /// Large-file storage content could not be materialized.
    #[error("LFS content could not be fetched in {path}: {stderr}")]
    Lfs { path: PathBuf, stderr: String },

    /// The target remote refused our credentials.
    #[error("authentication failed for {remote}")]
    Authentication { remote: String },

    /// The target branch advanced underneath the run.
    #[error("push to '{branch}' was rejected: {stderr}")]
    PushRejected { branch: String, stderr: String },

    /// An http(s) remote was configured but no token was supplied.
    #[error("no access token found in ${env}")]
    MissingCredential { env: String },

    /// The directory is not inside a git working tree.
    #[error("{path} is not a git repository")]
    NotARepository { path: PathBuf },

    /// A kept target clone inside the source would be mirrored into itself.
    #[error("work directory {workdir} is inside the source tree {source_dir}")]
    WorkdirInsideSource { workdir: PathBuf, source_dir: PathBuf },

    /// Sockets, FIFOs and device nodes cannot be mirrored.
    #[error("unsupported file type at {path}")]
    UnsupportedEntry { path: PathBuf },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
