use std::fs;
use std::path::Path;
use tickmirror_domain::repositories::catalog::SessionService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    Cached,
    Fresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub source: SessionSource,
}

/// Asks the operator for the request token issued after the browser login.
pub trait RequestTokenPrompt {
    fn request_token(&mut self, login_url: &str) -> Result<String, String>;
}

/// Returns the cached access token if the token file exists, otherwise runs
/// the interactive login exchange and persists the new token.
///
/// A cached token is returned as-is. An expired one only shows up later as an
/// authentication failure on the feed.
pub fn acquire_session(
    service: &dyn SessionService,
    token_path: &Path,
    prompt: &mut dyn RequestTokenPrompt,
) -> Result<Session, String> {
    if let Some(access_token) = load_cached_token(token_path)? {
        tracing::info!(path = %token_path.display(), "access token loaded from file");
        return Ok(Session {
            access_token,
            source: SessionSource::Cached,
        });
    }

    let login_url = service.login_url();
    let request_token = prompt.request_token(&login_url)?;
    let request_token = request_token.trim();
    if request_token.is_empty() {
        return Err("request token must not be empty".to_string());
    }

    let grant = service.generate_session(request_token).map_err(|err| {
        tracing::error!(error = %err, "error generating access token");
        format!("session exchange failed: {err}")
    })?;

    persist_token(token_path, &grant.access_token).map_err(|err| {
        tracing::error!(error = %err, "error saving access token");
        err
    })?;
    tracing::info!(
        path = %token_path.display(),
        user_id = grant.user_id.as_deref().unwrap_or("unknown"),
        "new access token generated and saved"
    );

    Ok(Session {
        access_token: grant.access_token,
        source: SessionSource::Fresh,
    })
}

fn load_cached_token(path: &Path) -> Result<Option<String>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("failed to read token file {}: {err}", path.display()))?;
    Ok(Some(raw.trim().to_string()))
}

fn persist_token(path: &Path, token: &str) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create {}: {err}", parent.display()))?;
    }
    fs::write(path, token)
        .map_err(|err| format!("failed to write token file {}: {err}", path.display()))
}
