use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tickmirror_domain::services::watchlist::DEFAULT_WATCHLIST;
use tickmirror_domain::value_objects::feed_mode::FeedMode;

pub const ENV_KITE_API_KEY: &str = "TICKMIRROR_KITE_API_KEY";
pub const ENV_KITE_API_SECRET: &str = "TICKMIRROR_KITE_API_SECRET";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub kite: KiteConfig,
    pub instruments: InstrumentsConfig,
    pub sheet: SheetConfig,
    pub flush: FlushConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct KiteConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub access_token_path: PathBuf,
    pub exchange: String,
    pub mode: FeedMode,
    pub reconnect_max_tries: u32,
    pub reconnect_max_delay_secs: u64,
}

impl Default for KiteConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            access_token_path: PathBuf::from("access_token.txt"),
            exchange: "NSE".to_string(),
            mode: FeedMode::Full,
            reconnect_max_tries: 50,
            reconnect_max_delay_secs: 60,
        }
    }
}

impl KiteConfig {
    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_max_delay_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct InstrumentsConfig {
    pub symbols: Vec<String>,
}

impl Default for InstrumentsConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct SheetConfig {
    pub credentials_path: PathBuf,
    pub spreadsheet: String,
    pub worksheet: String,
    pub new_worksheet_rows: u32,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("GOOGLE_SHEETS_CREDENTIALS"),
            spreadsheet: "Zerodha live data".to_string(),
            worksheet: "Live Data".to_string(),
            new_worksheet_rows: 100,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct FlushConfig {
    pub interval_secs: u64,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl FlushConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub path: PathBuf,
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("live_data_debug.log"),
            level: "info".to_string(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))?;
    validate(&config)?;
    Ok(config)
}

/// Loads `path` when given, otherwise the built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config, String> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = Config::default();
            validate(&config)?;
            Ok(config)
        }
    }
}

pub fn validate(config: &Config) -> Result<(), String> {
    if config.instruments.symbols.is_empty() {
        return Err("instruments.symbols must not be empty".to_string());
    }
    if config.kite.reconnect_max_delay_secs == 0 {
        return Err("kite.reconnect_max_delay_secs must be > 0".to_string());
    }
    if config.flush.interval_secs == 0 {
        return Err("flush.interval_secs must be > 0".to_string());
    }
    if config.sheet.spreadsheet.trim().is_empty() || config.sheet.worksheet.trim().is_empty() {
        return Err("sheet.spreadsheet and sheet.worksheet must be set".to_string());
    }
    Ok(())
}

pub fn resolve_api_key(kite: &KiteConfig) -> Result<String, String> {
    resolve_secret(kite.api_key.as_deref(), ENV_KITE_API_KEY, "kite.api_key")
}

pub fn resolve_api_secret(kite: &KiteConfig) -> Result<String, String> {
    resolve_secret(kite.api_secret.as_deref(), ENV_KITE_API_SECRET, "kite.api_secret")
}

fn resolve_secret(configured: Option<&str>, env_name: &str, field: &str) -> Result<String, String> {
    match configured {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => env::var(env_name)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| format!("missing {field} in config and env {env_name} is not set")),
    }
}
