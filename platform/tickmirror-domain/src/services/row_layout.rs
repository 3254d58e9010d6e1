use crate::value_objects::sheet_value::SheetValue;
use crate::value_objects::tick::Tick;

pub const COLUMN_COUNT: usize = 11;
pub const LAST_COLUMN: char = 'K';

pub const HEADER: [&str; COLUMN_COUNT] = [
    "Instrument Token",
    "Trading Symbol",
    "Last Price",
    "Volume",
    "Open",
    "High",
    "Low",
    "Close",
    "Total Buy",
    "Total Sell",
    "Timestamp",
];

pub type RowPayload = Vec<SheetValue>;

pub fn header_row() -> RowPayload {
    HEADER.iter().map(|h| SheetValue::text(*h)).collect()
}

/// Token and symbol followed by blank cells, reserved before any tick arrives.
pub fn placeholder_row(token: u32, symbol: &str) -> RowPayload {
    let mut row = Vec::with_capacity(COLUMN_COUNT);
    row.push(SheetValue::from(token));
    row.push(SheetValue::text(symbol));
    row.resize(COLUMN_COUNT, SheetValue::Empty);
    row
}

/// A1 range covering exactly one data row, e.g. `A5:K5`.
pub fn row_range(row: u32) -> String {
    format!("A{row}:{LAST_COLUMN}{row}")
}

/// Display payload for one tick, in header order.
///
/// Missing prices render as empty cells, missing quantities as zero.
pub fn tick_row(tick: &Tick, symbol: &str, timestamp: &str) -> Result<RowPayload, String> {
    let mut prices = vec![tick.last_price];
    if let Some(ohlc) = tick.ohlc {
        prices.extend([Some(ohlc.open), Some(ohlc.high), Some(ohlc.low), Some(ohlc.close)]);
    }
    if let Some(bad) = prices.into_iter().flatten().find(|p| !p.is_finite()) {
        return Err(format!("tick {} carries non-finite price {bad}", tick.token));
    }

    let ohlc = tick.ohlc;
    Ok(vec![
        SheetValue::from(tick.token),
        SheetValue::text(symbol),
        SheetValue::from(tick.last_price),
        SheetValue::from(tick.volume.unwrap_or(0)),
        SheetValue::from(ohlc.map(|o| o.open)),
        SheetValue::from(ohlc.map(|o| o.high)),
        SheetValue::from(ohlc.map(|o| o.low)),
        SheetValue::from(ohlc.map(|o| o.close)),
        SheetValue::from(tick.total_buy_quantity.unwrap_or(0)),
        SheetValue::from(tick.total_sell_quantity.unwrap_or(0)),
        SheetValue::text(timestamp),
    ])
}
