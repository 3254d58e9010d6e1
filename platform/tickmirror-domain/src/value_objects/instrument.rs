#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub token: u32,
    pub trading_symbol: String,
    pub name: String,
    pub exchange: String,
}

impl Instrument {
    pub fn new(token: u32, trading_symbol: impl Into<String>) -> Self {
        Self {
            token,
            trading_symbol: trading_symbol.into(),
            name: String::new(),
            exchange: String::new(),
        }
    }
}
