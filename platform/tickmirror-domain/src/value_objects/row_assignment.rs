use crate::value_objects::instrument::Instrument;
use std::collections::HashMap;

/// First worksheet row that holds instrument data (row 1 is the header).
pub const FIRST_DATA_ROW: u32 = 2;

/// Fixed mapping from instrument token to its 1-based worksheet row.
///
/// Built once from the resolver output and never mutated afterwards, so it is
/// shared read-only between the tick handler and startup code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowAssignment {
    rows: HashMap<u32, u32>,
    symbols: HashMap<u32, String>,
}

impl RowAssignment {
    /// Assigns `FIRST_DATA_ROW + i` to the i-th instrument, in the given order.
    pub fn sequential(instruments: &[Instrument]) -> Self {
        let mut rows = HashMap::with_capacity(instruments.len());
        let mut symbols = HashMap::with_capacity(instruments.len());
        for (idx, instrument) in instruments.iter().enumerate() {
            let row = FIRST_DATA_ROW + idx as u32;
            rows.insert(instrument.token, row);
            symbols.insert(instrument.token, instrument.trading_symbol.clone());
        }
        Self { rows, symbols }
    }

    pub fn row_for(&self, token: u32) -> Option<u32> {
        self.rows.get(&token).copied()
    }

    pub fn symbol_for(&self, token: u32) -> Option<&str> {
        self.symbols.get(&token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Assignments sorted by row, for log output.
    pub fn entries(&self) -> Vec<(u32, u32)> {
        let mut entries: Vec<(u32, u32)> = self.rows.iter().map(|(t, r)| (*t, *r)).collect();
        entries.sort_by_key(|(_, row)| *row);
        entries
    }
}
