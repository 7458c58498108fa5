//! Target remote URL resolution.
//!
//! http(s) remotes get the token injected as basic-auth userinfo; every other
//! form (local path, `file://`, ssh) is used verbatim and relies on ambient
//! credentials.

use repomirror_core::AccessToken;

use crate::error::SyncError;

/// Username GitHub expects alongside an installation or fine-grained token.
const TOKEN_USER: &str = "x-access-token";

/// Build the URL git should clone from and push to.
///
/// Returns [`SyncError::MissingCredential`] when an http(s) remote has no token.
pub fn authenticated_url(
    url: &str,
    token: Option<&AccessToken>,
    token_env: &str,
) -> Result<String, SyncError> {
    let scheme = if url.starts_with("https://") {
        "https://"
    } else if url.starts_with("http://") {
        "http://"
    } else {
        return Ok(url.to_string());
    };

    let token = token
        .filter(|t| !t.expose().is_empty())
        .ok_or_else(|| SyncError::MissingCredential {
            env: token_env.to_string(),
        })?;

    let rest = &url[scheme.len()..];
    // Drop any userinfo already present so ours is the only one.
    let host_and_path = match rest.split_once('/') {
        Some((authority, path)) => {
            let host = authority.rsplit('@').next().unwrap_or(authority);
            format!("{host}/{path}")
        }
        None => rest.rsplit('@').next().unwrap_or(rest).to_string(),
    };

    Ok(format!(
        "{scheme}{TOKEN_USER}:{}@{host_and_path}",
        token.expose()
    ))
}

/// Strip userinfo from an http(s) URL for log lines and error messages.
pub fn display_url(url: &str) -> String {
    for scheme in ["https://", "http://"] {
        if let Some(rest) = url.strip_prefix(scheme) {
            let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
            let host = authority.rsplit('@').next().unwrap_or(authority);
            return if path.is_empty() {
                format!("{scheme}{host}")
            } else {
                format!("{scheme}{host}/{path}")
            };
        }
    }
    url.to_string()
}
