use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

const SCOPES: &str = "https://spreadsheets.google.com/feeds https://www.googleapis.com/auth/drive";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

enum Source {
    ServiceAccount {
        key: ServiceAccountKey,
        cached: Mutex<Option<CachedToken>>,
    },
    Fixed(String),
}

/// Bearer tokens for the Google APIs.
pub struct GoogleAuth {
    source: Source,
}

impl GoogleAuth {
    pub fn from_service_account_file(path: &Path) -> Result<Self, String> {
        let raw = fs::read_to_string(path).map_err(|err| {
            format!("failed to read service account key {}: {err}", path.display())
        })?;
        Self::from_service_account_json(&raw)
    }

    pub fn from_service_account_json(raw: &str) -> Result<Self, String> {
        let key: ServiceAccountKey = serde_json::from_str(raw)
            .map_err(|err| format!("invalid service account key: {err}"))?;
        Ok(Self {
            source: Source::ServiceAccount {
                key,
                cached: Mutex::new(None),
            },
        })
    }

    /// Uses a pre-issued access token as-is.
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            source: Source::Fixed(token.into()),
        }
    }

    pub fn bearer(&self, client: &Client) -> Result<String, String> {
        match &self.source {
            Source::Fixed(token) => Ok(token.clone()),
            Source::ServiceAccount { key, cached } => {
                let mut cached = cached.lock();
                if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
                    return Ok(token.value.clone());
                }
                let fresh = fetch_token(client, key)?;
                let lifetime = Duration::from_secs(fresh.expires_in);
                let value = fresh.access_token;
                *cached = Some(CachedToken {
                    value: value.clone(),
                    refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
                });
                tracing::debug!(client_email = %key.client_email, "google access token refreshed");
                Ok(value)
            }
        }
    }
}

fn signed_assertion(key: &ServiceAccountKey) -> Result<String, String> {
    let iat = chrono::Utc::now().timestamp();
    let claims = Claims {
        iss: &key.client_email,
        scope: SCOPES,
        aud: &key.token_uri,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };
    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|err| format!("invalid service account private key: {err}"))?;
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
        .map_err(|err| format!("failed to sign token assertion: {err}"))
}

fn fetch_token(client: &Client, key: &ServiceAccountKey) -> Result<TokenResponse, String> {
    let assertion = signed_assertion(key)?;
    let resp = client
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", assertion.as_str())])
        .send()
        .map_err(|err| format!("google token request failed: {err}"))?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Err(format!(
            "google token request rejected: status {}: {}",
            status.as_u16(),
            body.trim()
        ));
    }
    resp.json::<TokenResponse>()
        .map_err(|err| format!("failed to parse google token response: {err}"))
}
