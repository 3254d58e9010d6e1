#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// One market data update for one instrument, as delivered by the feed.
///
/// Only `token` is guaranteed. LTP-mode packets carry just the last price and
/// index packets carry no volume or depth totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tick {
    pub token: u32,
    pub last_price: Option<f64>,
    pub volume: Option<u64>,
    pub ohlc: Option<Ohlc>,
    pub total_buy_quantity: Option<u64>,
    pub total_sell_quantity: Option<u64>,
    pub exchange_timestamp: Option<i64>,
}

impl Tick {
    pub fn new(token: u32) -> Self {
        Self {
            token,
            ..Self::default()
        }
    }
}
