use crate::value_objects::sheet_value::SheetValue;
use std::sync::Arc;

/// Entry point to the spreadsheet provider.
pub trait SpreadsheetService {
    fn open(&self, name: &str) -> Result<Box<dyn Spreadsheet>, String>;
}

pub trait Spreadsheet {
    fn title(&self) -> &str;
    /// `Ok(None)` when no worksheet carries that title.
    fn worksheet(&self, name: &str) -> Result<Option<Arc<dyn Worksheet>>, String>;
    fn add_worksheet(&self, title: &str, rows: u32, cols: u32)
        -> Result<Arc<dyn Worksheet>, String>;
}

/// One tab of a spreadsheet. Shared between startup code and the flusher.
pub trait Worksheet: Send + Sync {
    fn title(&self) -> &str;
    fn append_row(&self, values: &[SheetValue]) -> Result<(), String>;
    /// Cell values of a 1-based column, top to bottom, as displayed strings.
    fn col_values(&self, col: u32) -> Result<Vec<String>, String>;
    /// Writes `values` (row-major) into an A1-notation range such as `A2:K2`.
    fn update(&self, range: &str, values: &[Vec<SheetValue>]) -> Result<(), String>;
}
