//! repomirror core library: domain types, job configuration, errors.
//!
//! - [`types`]: validated identifiers, allow-list, [`MirrorConfig`]
//! - [`error`]: [`ConfigError`]
//! - [`config`]: load / save / validate `repomirror.yaml`

pub mod config;
pub mod error;
pub mod types;

pub use error::ConfigError;
pub use types::{
    commit_message, AccessToken, AllowList, CommitIdentity, CommitSha, MirrorConfig, PushPolicy,
    RepoFullName, SourceSpec, TargetSpec,
};
