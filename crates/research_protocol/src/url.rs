use ::url::Url;

use crate::error::ProtocolError;
use crate::session_id::SessionId;

/// Default backend address for local runs.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8000";

const SESSION_PATH_PREFIX: &str = "ws";

/// Builds the per-session stream endpoint `<base>/ws/<session_id>`.
///
/// Normalization rules:
/// 1) a blank base falls back to [`DEFAULT_SERVER_URL`]
/// 2) `http`/`https` bases are rewritten to `ws`/`wss`
/// 3) trailing slashes on the base path are dropped before appending
pub fn session_endpoint(base_url: &str, session_id: &SessionId) -> Result<Url, ProtocolError> {
    let base = if base_url.trim().is_empty() {
        DEFAULT_SERVER_URL
    } else {
        base_url.trim()
    };

    let mut url = Url::parse(base)
        .map_err(|error| ProtocolError::InvalidBaseUrl(format!("{base}: {error}")))?;

    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => {
            return Err(ProtocolError::InvalidBaseUrl(format!(
                "{base}: unsupported scheme '{other}'"
            )))
        }
    };
    if url.scheme() != scheme && url.set_scheme(scheme).is_err() {
        return Err(ProtocolError::InvalidBaseUrl(format!(
            "{base}: cannot switch scheme to '{scheme}'"
        )));
    }

    let base_path = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{base_path}/{SESSION_PATH_PREFIX}/{session_id}"));
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// Extracts the session identifier segment from a `/ws/<session_id>` path.
pub fn session_id_from_path(path: &str) -> Option<&str> {
    let (prefix, id) = path.trim_end_matches('/').rsplit_once('/')?;
    if prefix.rsplit('/').next() != Some(SESSION_PATH_PREFIX) || id.is_empty() {
        return None;
    }
    Some(id)
}
