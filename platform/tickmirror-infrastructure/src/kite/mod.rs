mod connect;
pub mod packet;
mod ticker;

pub use connect::KiteConnect;
pub use ticker::{KiteTicker, ReconnectPolicy, KITE_TICKER_URL};
