//! `repomirror.yaml` job configuration.
//!
//! # Storage layout
//!
//! ```text
//! <repo root>/
//!   repomirror.yaml   (mode 0600)
//! ```
//!
//! # API pattern
//!
//! Functions take the config file path explicitly; [`default_path_in`] gives
//! the conventional location inside a checkout. Saves are atomic: serialize →
//! `.tmp` sibling → `chmod 0600` → `rename`.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::MirrorConfig;

pub const CONFIG_FILE_NAME: &str = "repomirror.yaml";

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<dir>/repomirror.yaml`: pure, no I/O.
pub fn default_path_in(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load and validate the config at `path`.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML, and
/// `ConfigError::Invalid` if a field fails validation.
pub fn load_at(path: &Path) -> Result<MirrorConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    let config: MirrorConfig = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save `config` to `path`, creating parent directories.
pub fn save_at(path: &Path, config: &MirrorConfig) -> Result<(), ConfigError> {
    validate(config)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| CONFIG_FILE_NAME.to_string());
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Validation
// ---------------------------------------------------------------------------

/// Check the invariants serde cannot express.
pub fn validate(config: &MirrorConfig) -> Result<(), ConfigError> {
    if config.version != MirrorConfig::VERSION {
        return Err(invalid(
            "version",
            format!(
                "unsupported version {} (expected {})",
                config.version,
                MirrorConfig::VERSION
            ),
        ));
    }
    validate_branch("source.branch", &config.source.branch)?;
    validate_branch("target.branch", &config.target.branch)?;

    if config.target.token_env.trim().is_empty() {
        return Err(invalid("target.token_env", "must not be empty".to_string()));
    }
    if config.identity.name.trim().is_empty() || !config.identity.email.contains('@') {
        return Err(invalid(
            "identity",
            "requires a name and an email address".to_string(),
        ));
    }

    for name in &config.preserve {
        let bad = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\');
        if bad {
            return Err(invalid(
                "preserve",
                format!("'{name}' must be a single top-level name"),
            ));
        }
    }
    Ok(())
}

fn validate_branch(field: &str, branch: &str) -> Result<(), ConfigError> {
    let bad = branch.is_empty()
        || branch.chars().any(char::is_whitespace)
        || branch.contains("..")
        || branch.starts_with('-')
        || branch.ends_with('/');
    if bad {
        return Err(invalid(field, format!("'{branch}' is not a valid branch name")));
    }
    Ok(())
}

fn invalid(field: &str, reason: String) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason,
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
