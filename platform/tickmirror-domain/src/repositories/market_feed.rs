use crate::value_objects::feed_mode::FeedMode;
use crate::value_objects::tick::Tick;

/// `Disconnected` failures are transient and worth a reconnect; `Protocol`
/// means the server refused us.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedError {
    Disconnected(String),
    Protocol(String),
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Disconnected(msg) => write!(f, "disconnected: {msg}"),
            FeedError::Protocol(msg) => write!(f, "protocol: {msg}"),
        }
    }
}

impl std::error::Error for FeedError {}

/// Requests the core can issue on a live feed connection.
pub trait FeedControl {
    fn subscribe(&mut self, tokens: &[u32]) -> Result<(), FeedError>;
    fn set_mode(&mut self, mode: FeedMode, tokens: &[u32]) -> Result<(), FeedError>;
}

/// Callbacks the feed transport invokes. The transport owns the event loop;
/// implementations must not fail back into it.
pub trait FeedHandler: Send + Sync {
    fn on_connect(&self, control: &mut dyn FeedControl);
    fn on_ticks(&self, ticks: &[Tick]);
    fn on_close(&self, code: u16, reason: &str);
}
