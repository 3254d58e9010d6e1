use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};
use tickmirror_domain::repositories::catalog::{InstrumentCatalog, SessionGrant, SessionService};
use tickmirror_domain::value_objects::instrument::Instrument;

const KITE_API_ROOT: &str = "https://api.kite.trade";
const KITE_LOGIN_URL: &str = "https://kite.zerodha.com/connect/login";
const KITE_VERSION: &str = "3";

/// Blocking client for the Kite Connect REST API (login + instrument dump).
pub struct KiteConnect {
    api_key: String,
    api_secret: String,
    access_token: Option<String>,
    root: String,
    client: Client,
}

impl KiteConnect {
    pub fn new(api_key: String, api_secret: String) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|err| format!("failed to build http client: {err}"))?;
        Ok(Self {
            api_key,
            api_secret,
            access_token: None,
            root: KITE_API_ROOT.to_string(),
            client,
        })
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    fn checksum(&self, request_token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.api_key.as_bytes());
        hasher.update(request_token.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn auth_header(&self) -> Result<String, String> {
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| "kite access token is not set".to_string())?;
        Ok(format!("token {}:{}", self.api_key, token))
    }
}

#[derive(Debug, Deserialize)]
struct KiteEnvelope<T> {
    status: String,
    data: Option<T>,
    message: Option<String>,
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionData {
    access_token: String,
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstrumentRecord {
    instrument_token: u32,
    tradingsymbol: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    exchange: String,
}

fn decode_envelope<T: DeserializeOwned>(body: &str) -> Result<T, String> {
    let envelope: KiteEnvelope<T> = serde_json::from_str(body)
        .map_err(|err| format!("failed to parse kite response: {err}"))?;
    if envelope.status != "success" {
        return Err(format!(
            "{}: {}",
            envelope.error_type.as_deref().unwrap_or("KiteException"),
            envelope.message.as_deref().unwrap_or("request failed")
        ));
    }
    envelope
        .data
        .ok_or_else(|| "kite response missing data".to_string())
}

/// Decodes the `/instruments` CSV dump, ignoring columns we do not use.
pub(crate) fn parse_instruments_csv(body: &str) -> Result<Vec<Instrument>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());
    let mut out = Vec::new();
    for (idx, record) in reader.deserialize::<InstrumentRecord>().enumerate() {
        let record =
            record.map_err(|err| format!("invalid instrument row {}: {err}", idx + 2))?;
        out.push(Instrument {
            token: record.instrument_token,
            trading_symbol: record.tradingsymbol,
            name: record.name,
            exchange: record.exchange,
        });
    }
    Ok(out)
}

impl SessionService for KiteConnect {
    fn login_url(&self) -> String {
        format!("{KITE_LOGIN_URL}?v={KITE_VERSION}&api_key={}", self.api_key)
    }

    fn generate_session(&self, request_token: &str) -> Result<SessionGrant, String> {
        let endpoint = format!("{}/session/token", self.root);
        let span = tracing::info_span!("infra.kite.session", endpoint = %endpoint);
        let _enter = span.enter();

        let checksum = self.checksum(request_token);
        let resp = self
            .client
            .post(&endpoint)
            .header("X-Kite-Version", KITE_VERSION)
            .form(&[
                ("api_key", self.api_key.as_str()),
                ("request_token", request_token),
                ("checksum", checksum.as_str()),
            ])
            .send()
            .map_err(|err| format!("session request failed: {err}"))?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|err| format!("failed to read session response: {err}"))?;
        let data: SessionData = decode_envelope(&body)
            .map_err(|err| format!("session exchange rejected (status {}): {err}", status.as_u16()))?;
        Ok(SessionGrant {
            access_token: data.access_token,
            user_id: data.user_id,
        })
    }
}

impl InstrumentCatalog for KiteConnect {
    fn list_instruments(&self, exchange: &str) -> Result<Vec<Instrument>, String> {
        let endpoint = format!("{}/instruments/{}", self.root, exchange);
        let span = tracing::info_span!("infra.kite.instruments", endpoint = %endpoint);
        let _enter = span.enter();

        let start = Instant::now();
        let resp = self
            .client
            .get(&endpoint)
            .header("X-Kite-Version", KITE_VERSION)
            .header("Authorization", self.auth_header()?)
            .send()
            .map_err(|err| format!("instruments request failed: {err}"))?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|err| format!("failed to read instruments response: {err}"))?;
        if !status.is_success() {
            // Errors come back as a JSON envelope even on the CSV endpoint.
            let detail = decode_envelope::<serde_json::Value>(&body)
                .err()
                .unwrap_or_else(|| "unexpected response".to_string());
            return Err(format!("instruments http error: status {}: {detail}", status.as_u16()));
        }

        let instruments = parse_instruments_csv(&body)?;
        metrics::histogram!("tickmirror.infra.kite.instruments_ms")
            .record(start.elapsed().as_millis() as f64);
        tracing::debug!(count = instruments.len(), "instrument dump decoded");
        Ok(instruments)
    }
}
