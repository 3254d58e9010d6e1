//! Google Sheets v4 / Drive v3 adapter for the spreadsheet ports.
//!
//! Spreadsheets are located by title through Drive, then addressed by id.
//! Every worksheet call goes straight to the API; nothing is cached apart
//! from the bearer token.

mod auth;

pub use auth::{GoogleAuth, ServiceAccountKey};

use reqwest::blocking::Client;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tickmirror_domain::repositories::spreadsheet::{Spreadsheet, SpreadsheetService, Worksheet};
use tickmirror_domain::value_objects::sheet_value::SheetValue;
use url::Url;

const SHEETS_API_ROOT: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

struct SheetsApi {
    auth: GoogleAuth,
    client: Client,
    sheets_root: String,
    drive_files: String,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct BatchUpdateReply {
    #[serde(default)]
    replies: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetsApi {
    fn url(&self, base: &str, segments: &[&str]) -> Result<Url, String> {
        let mut url = Url::parse(base).map_err(|err| format!("invalid api url {base}: {err}"))?;
        url.path_segments_mut()
            .map_err(|_| format!("api url cannot take a path: {base}"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str, suffix: &str) -> Result<Url, String> {
        let segment = format!("{range}{suffix}");
        self.url(&self.sheets_root, &[spreadsheet_id, "values", &segment])
    }

    fn call<T: DeserializeOwned>(
        &self,
        op: &'static str,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<T, String> {
        let start = Instant::now();
        let token = self.auth.bearer(&self.client)?;
        let mut req = self.client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(body);
        }
        let result = req
            .send()
            .map_err(|err| format!("{op} request failed: {err}"))
            .and_then(|resp| {
                let status = resp.status();
                let text = resp
                    .text()
                    .map_err(|err| format!("failed to read {op} response: {err}"))?;
                if !status.is_success() {
                    return Err(format!("{op} failed: {}", describe_error(status.as_u16(), &text)));
                }
                serde_json::from_str::<T>(&text)
                    .map_err(|err| format!("failed to parse {op} response: {err}"))
            });

        metrics::counter!("tickmirror.infra.sheets.requests_total", "op" => op).increment(1);
        metrics::histogram!("tickmirror.infra.sheets.request_ms", "op" => op)
            .record(start.elapsed().as_millis() as f64);
        if result.is_err() {
            metrics::counter!("tickmirror.infra.sheets.errors_total", "op" => op).increment(1);
        }
        result
    }
}

fn describe_error(status: u16, body: &str) -> String {
    match serde_json::from_str::<GoogleErrorBody>(body) {
        Ok(parsed) => format!(
            "status {} {}: {}",
            parsed.error.code.unwrap_or(status),
            parsed.error.status.as_deref().unwrap_or("UNKNOWN"),
            parsed.error.message.as_deref().unwrap_or("no message")
        ),
        Err(_) => format!("status {status}: {}", body.trim()),
    }
}

/// A1 reference scoped to a worksheet, e.g. `'Live Data'!A3:K3`.
pub fn qualified_range(title: &str, range: &str) -> String {
    format!("'{}'!{range}", title.replace('\'', "''"))
}

/// 1-based column index to its letter form (1 -> A, 27 -> AA).
pub fn column_letter(mut col: u32) -> String {
    let mut out = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        out.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Entry point implementing [`SpreadsheetService`].
#[derive(Clone)]
pub struct GoogleSheets {
    api: Arc<SheetsApi>,
}

impl GoogleSheets {
    pub fn new(auth: GoogleAuth) -> Result<Self, String> {
        Self::with_roots(auth, SHEETS_API_ROOT, DRIVE_FILES_URL)
    }

    pub fn with_roots(auth: GoogleAuth, sheets_root: &str, drive_files: &str) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|err| format!("failed to build http client: {err}"))?;
        Ok(Self {
            api: Arc::new(SheetsApi {
                auth,
                client,
                sheets_root: sheets_root.trim_end_matches('/').to_string(),
                drive_files: drive_files.trim_end_matches('/').to_string(),
            }),
        })
    }
}

impl SpreadsheetService for GoogleSheets {
    fn open(&self, name: &str) -> Result<Box<dyn Spreadsheet>, String> {
        let span = tracing::info_span!("infra.sheets.open", spreadsheet = name);
        let _enter = span.enter();

        let mut url = self.api.url(&self.api.drive_files, &[])?;
        let query = format!(
            "name = '{}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false",
            name.replace('\\', "\\\\").replace('\'', "\\'")
        );
        url.query_pairs_mut()
            .append_pair("q", &query)
            .append_pair("fields", "files(id,name)")
            .append_pair("supportsAllDrives", "true")
            .append_pair("includeItemsFromAllDrives", "true");

        let list: DriveFileList = self.api.call("drive.files.list", Method::GET, url, None)?;
        let file = list
            .files
            .into_iter()
            .next()
            .ok_or_else(|| format!("spreadsheet not found: {name}"))?;
        tracing::debug!(id = %file.id, "spreadsheet located");
        Ok(Box::new(GoogleSpreadsheet {
            api: Arc::clone(&self.api),
            id: file.id,
            title: file.name,
        }))
    }
}

pub struct GoogleSpreadsheet {
    api: Arc<SheetsApi>,
    id: String,
    title: String,
}

impl GoogleSpreadsheet {
    fn worksheet_handle(&self, props: SheetProperties) -> Arc<dyn Worksheet> {
        Arc::new(GoogleWorksheet {
            api: Arc::clone(&self.api),
            spreadsheet_id: self.id.clone(),
            title: props.title,
        })
    }
}

impl Spreadsheet for GoogleSpreadsheet {
    fn title(&self) -> &str {
        &self.title
    }

    fn worksheet(&self, name: &str) -> Result<Option<Arc<dyn Worksheet>>, String> {
        let mut url = self.api.url(&self.api.sheets_root, &[&self.id])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title)");
        let meta: SpreadsheetMeta = self.api.call("spreadsheets.get", Method::GET, url, None)?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|entry| entry.properties)
            .find(|props| props.title == name)
            .map(|props| self.worksheet_handle(props)))
    }

    fn add_worksheet(&self, title: &str, rows: u32, cols: u32) -> Result<Arc<dyn Worksheet>, String> {
        let segment = format!("{}:batchUpdate", self.id);
        let url = self.api.url(&self.api.sheets_root, &[&segment])?;
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": { "rowCount": rows, "columnCount": cols }
                    }
                }
            }]
        });
        let reply: BatchUpdateReply =
            self.api.call("spreadsheets.batchUpdate", Method::POST, url, Some(&body))?;
        let props = reply
            .replies
            .into_iter()
            .next()
            .and_then(|r| r.pointer("/addSheet/properties").cloned())
            .ok_or_else(|| "addSheet reply missing properties".to_string())
            .and_then(|p| {
                serde_json::from_value::<SheetProperties>(p)
                    .map_err(|err| format!("invalid addSheet properties: {err}"))
            })?;
        tracing::info!(worksheet = %props.title, sheet_id = props.sheet_id, "worksheet created");
        Ok(self.worksheet_handle(props))
    }
}

pub struct GoogleWorksheet {
    api: Arc<SheetsApi>,
    spreadsheet_id: String,
    title: String,
}

impl Worksheet for GoogleWorksheet {
    fn title(&self) -> &str {
        &self.title
    }

    fn append_row(&self, values: &[SheetValue]) -> Result<(), String> {
        let range = qualified_range(&self.title, "A1");
        let mut url = self.api.values_url(&self.spreadsheet_id, &range, ":append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let body = json!({ "majorDimension": "ROWS", "values": [values] });
        let _: Value = self.api.call("values.append", Method::POST, url, Some(&body))?;
        Ok(())
    }

    fn col_values(&self, col: u32) -> Result<Vec<String>, String> {
        let letter = column_letter(col);
        let range = qualified_range(&self.title, &format!("{letter}:{letter}"));
        let mut url = self.api.values_url(&self.spreadsheet_id, &range, "")?;
        url.query_pairs_mut().append_pair("majorDimension", "COLUMNS");
        let values: ValueRange = self.api.call("values.get", Method::GET, url, None)?;
        Ok(values
            .values
            .into_iter()
            .next()
            .map(|column| column.iter().map(cell_text).collect())
            .unwrap_or_default())
    }

    fn update(&self, range: &str, values: &[Vec<SheetValue>]) -> Result<(), String> {
        let range = qualified_range(&self.title, range);
        let mut url = self.api.values_url(&self.spreadsheet_id, &range, "")?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = json!({ "range": range, "majorDimension": "ROWS", "values": values });
        let _: Value = self.api.call("values.update", Method::PUT, url, Some(&body))?;
        Ok(())
    }
}
