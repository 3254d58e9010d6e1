#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use tickmirror_domain::repositories::spreadsheet::{Spreadsheet, SpreadsheetService, Worksheet};
use tickmirror_domain::value_objects::sheet_value::SheetValue;
use tracing_subscriber::fmt::MakeWriter;

pub struct MemoryWorksheet {
    title: String,
    pub rows: Mutex<Vec<Vec<SheetValue>>>,
    pub updates: Mutex<Vec<(String, Vec<Vec<SheetValue>>)>>,
    /// 1-based index of the `update` call that fails.
    pub fail_update_call: Option<usize>,
    update_calls: Mutex<usize>,
}

impl MemoryWorksheet {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            rows: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            fail_update_call: None,
            update_calls: Mutex::new(0),
        }
    }

    pub fn failing_on(title: &str, call: usize) -> Self {
        Self {
            fail_update_call: Some(call),
            ..Self::new(title)
        }
    }

    pub fn with_rows(title: &str, rows: Vec<Vec<SheetValue>>) -> Self {
        let ws = Self::new(title);
        *ws.rows.lock() = rows;
        ws
    }

    pub fn update_calls(&self) -> usize {
        *self.update_calls.lock()
    }

    pub fn column_a(&self) -> Vec<String> {
        self.col_values(1).unwrap()
    }
}

impl Worksheet for MemoryWorksheet {
    fn title(&self) -> &str {
        &self.title
    }

    fn append_row(&self, values: &[SheetValue]) -> Result<(), String> {
        self.rows.lock().push(values.to_vec());
        Ok(())
    }

    fn col_values(&self, col: u32) -> Result<Vec<String>, String> {
        let idx = (col - 1) as usize;
        Ok(self
            .rows
            .lock()
            .iter()
            .map(|row| row.get(idx).map(|v| v.to_string()).unwrap_or_default())
            .collect())
    }

    fn update(&self, range: &str, values: &[Vec<SheetValue>]) -> Result<(), String> {
        let mut calls = self.update_calls.lock();
        *calls += 1;
        if self.fail_update_call == Some(*calls) {
            return Err("429 RESOURCE_EXHAUSTED: quota exceeded".to_string());
        }
        self.updates.lock().push((range.to_string(), values.to_vec()));
        Ok(())
    }
}

pub struct MemorySpreadsheet {
    title: String,
    pub worksheets: Mutex<Vec<Arc<MemoryWorksheet>>>,
    pub added: Mutex<Vec<(String, u32, u32)>>,
}

impl MemorySpreadsheet {
    pub fn new(title: &str) -> Arc<Self> {
        Arc::new(Self {
            title: title.to_string(),
            worksheets: Mutex::new(Vec::new()),
            added: Mutex::new(Vec::new()),
        })
    }

    pub fn with_worksheet(title: &str, worksheet: Arc<MemoryWorksheet>) -> Arc<Self> {
        let sheet = Self::new(title);
        sheet.worksheets.lock().push(worksheet);
        sheet
    }

    pub fn find(&self, name: &str) -> Option<Arc<MemoryWorksheet>> {
        self.worksheets
            .lock()
            .iter()
            .find(|ws| ws.title() == name)
            .cloned()
    }
}

struct SpreadsheetHandle(Arc<MemorySpreadsheet>);

impl Spreadsheet for SpreadsheetHandle {
    fn title(&self) -> &str {
        &self.0.title
    }

    fn worksheet(&self, name: &str) -> Result<Option<Arc<dyn Worksheet>>, String> {
        Ok(self.0.find(name).map(|ws| ws as Arc<dyn Worksheet>))
    }

    fn add_worksheet(&self, title: &str, rows: u32, cols: u32) -> Result<Arc<dyn Worksheet>, String> {
        let ws = Arc::new(MemoryWorksheet::new(title));
        self.0.worksheets.lock().push(ws.clone());
        self.0.added.lock().push((title.to_string(), rows, cols));
        Ok(ws)
    }
}

#[derive(Default)]
pub struct MemorySheets {
    books: HashMap<String, Arc<MemorySpreadsheet>>,
}

impl MemorySheets {
    pub fn with(book: Arc<MemorySpreadsheet>) -> Self {
        let mut books = HashMap::new();
        books.insert(book.title.clone(), book);
        Self { books }
    }
}

impl SpreadsheetService for MemorySheets {
    fn open(&self, name: &str) -> Result<Box<dyn Spreadsheet>, String> {
        self.books
            .get(name)
            .cloned()
            .map(|book| Box::new(SpreadsheetHandle(book)) as Box<dyn Spreadsheet>)
            .ok_or_else(|| format!("spreadsheet not found: {name}"))
    }
}

/// Collects formatted log lines so tests can assert on them.
#[derive(Clone, Default)]
pub struct LogCapture {
    lines: Arc<Mutex<Vec<String>>>,
}

impl LogCapture {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn count_level(&self, level: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(level)).count()
    }

    /// Runs `f` with a thread-local subscriber writing into this capture.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(self.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter {
            lines: self.lines.clone(),
            partial: String::new(),
        }
    }
}

pub struct CaptureWriter {
    lines: Arc<Mutex<Vec<String>>>,
    partial: String,
}

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.partial.push_str(&String::from_utf8_lossy(buf));
        while let Some(idx) = self.partial.find('\n') {
            let line = self.partial[..idx].trim_end_matches('\r').to_string();
            self.partial.drain(..=idx);
            if !line.is_empty() {
                self.lines.lock().push(line);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for CaptureWriter {
    fn drop(&mut self) {
        let line = self.partial.trim().to_string();
        if !line.is_empty() {
            self.lines.lock().push(line);
        }
    }
}
