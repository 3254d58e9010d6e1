use super::packet::{decode_frame, Frame};
use serde::Deserialize;
use std::net::TcpStream;
use std::thread;
use std::time::Duration;
use tickmirror_domain::repositories::market_feed::{FeedControl, FeedError, FeedHandler};
use tickmirror_domain::value_objects::feed_mode::FeedMode;
use tungstenite::protocol::Message;
use tungstenite::stream::MaybeTlsStream;
use url::Url;

pub const KITE_TICKER_URL: &str = "wss://ws.kite.trade";

// Close code reported to the handler when the socket dies without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;
const NO_STATUS: u16 = 1005;
// Reads allowed after a server close frame while our reply is flushed.
const CLOSE_DRAIN_LIMIT: usize = 16;

/// Backoff for [`KiteTicker::run_with_reconnect`]: the delay starts at
/// `initial_delay` and doubles per consecutive failure up to `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_tries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_tries: 50,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Blocking Kite ticker connection. `run` owns the read loop and dispatches
/// to a [`FeedHandler`] until the server closes or the socket fails.
#[derive(Debug)]
pub struct KiteTicker {
    socket: tungstenite::WebSocket<MaybeTlsStream<TcpStream>>,
}

#[derive(Debug, Deserialize)]
struct TextEnvelope {
    #[serde(rename = "type")]
    r#type: String,
    data: Option<serde_json::Value>,
}

impl KiteTicker {
    /// A handshake answered with an HTTP status is a [`FeedError::Protocol`];
    /// anything that never reached the server is [`FeedError::Disconnected`].
    pub fn connect_to(root: &str, api_key: &str, access_token: &str) -> Result<Self, FeedError> {
        let mut url = Url::parse(root)
            .map_err(|e| FeedError::Protocol(format!("invalid ticker URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("api_key", api_key)
            .append_pair("access_token", access_token);

        let (socket, _resp) = tungstenite::connect(url.as_str()).map_err(|e| match e {
            tungstenite::Error::Http(resp) => FeedError::Protocol(format!(
                "ticker handshake rejected with status {} (expired access token?)",
                resp.status().as_u16()
            )),
            other => FeedError::Disconnected(format!("ticker connect failed: {other}")),
        })?;
        tracing::info!(endpoint = root, "ticker websocket connected");
        Ok(Self { socket })
    }

    /// Connects and runs, reconnecting after transport failures until
    /// `policy.max_tries` consecutive attempts have failed. A server close
    /// frame or a rejected handshake ends the feed without a retry.
    pub fn run_with_reconnect(
        root: &str,
        api_key: &str,
        access_token: &str,
        handler: &dyn FeedHandler,
        policy: &ReconnectPolicy,
    ) -> Result<(), FeedError> {
        let mut failures = 0u32;
        loop {
            let outcome = match Self::connect_to(root, api_key, access_token) {
                Ok(mut ticker) => {
                    failures = 0;
                    ticker.run(handler)
                }
                Err(err @ FeedError::Disconnected(_)) => {
                    handler.on_close(ABNORMAL_CLOSURE, &err.to_string());
                    Err(err)
                }
                Err(err) => Err(err),
            };

            let err = match outcome {
                Ok(()) => return Ok(()),
                Err(err @ FeedError::Protocol(_)) => return Err(err),
                Err(err) => err,
            };
            failures += 1;
            if failures > policy.max_tries {
                tracing::error!(attempts = policy.max_tries, error = %err, "ticker reconnect attempts exhausted");
                return Err(err);
            }
            let delay = policy.delay(failures);
            metrics::counter!("tickmirror.feed.reconnects_total").increment(1);
            tracing::warn!(
                attempt = failures,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "ticker connection lost, reconnecting"
            );
            thread::sleep(delay);
        }
    }

    /// Runs until the connection ends. A server close returns `Ok`, a
    /// transport failure returns the error, and the handler's `on_close` sees
    /// both.
    pub fn run(&mut self, handler: &dyn FeedHandler) -> Result<(), FeedError> {
        handler.on_connect(self);

        loop {
            let msg = match self.socket.read() {
                Ok(msg) => msg,
                Err(e) => {
                    let reason = e.to_string();
                    handler.on_close(ABNORMAL_CLOSURE, &reason);
                    return Err(FeedError::Disconnected(reason));
                }
            };

            match msg {
                Message::Binary(data) => match decode_frame(&data) {
                    Ok(Frame::Ticks(ticks)) if !ticks.is_empty() => handler.on_ticks(&ticks),
                    Ok(_) => {}
                    Err(err) => {
                        metrics::counter!("tickmirror.feed.bad_frames_total").increment(1);
                        tracing::warn!(error = %err, bytes = data.len(), "dropping malformed ticker frame");
                    }
                },
                Message::Text(text) => log_text_message(&text),
                // tungstenite queues the pong itself.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                Message::Close(frame) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.to_string()))
                        .unwrap_or((NO_STATUS, String::new()));
                    self.finish_close();
                    handler.on_close(code, &reason);
                    return Ok(());
                }
            }
        }
    }

    // Sends the queued close reply and waits for the server to drop the
    // connection.
    fn finish_close(&mut self) {
        for _ in 0..CLOSE_DRAIN_LIMIT {
            match self.socket.read() {
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed) => return,
                Err(err) => {
                    tracing::debug!(error = %err, "ticker closing handshake ended early");
                    return;
                }
            }
        }
    }

    fn send_json(&mut self, payload: serde_json::Value) -> Result<(), FeedError> {
        self.socket
            .send(Message::Text(payload.to_string()))
            .map_err(|e| FeedError::Disconnected(format!("send failed: {e}")))
    }
}

impl FeedControl for KiteTicker {
    fn subscribe(&mut self, tokens: &[u32]) -> Result<(), FeedError> {
        self.send_json(serde_json::json!({ "a": "subscribe", "v": tokens }))
    }

    fn set_mode(&mut self, mode: FeedMode, tokens: &[u32]) -> Result<(), FeedError> {
        self.send_json(serde_json::json!({ "a": "mode", "v": [mode.as_str(), tokens] }))
    }
}

fn log_text_message(text: &str) {
    let Ok(envelope) = serde_json::from_str::<TextEnvelope>(text) else {
        tracing::debug!(text, "ignoring unrecognised ticker text message");
        return;
    };
    let data = envelope.data.map(|d| d.to_string()).unwrap_or_default();
    match envelope.r#type.as_str() {
        "error" => tracing::error!(data = %data, "ticker reported an error"),
        "message" => tracing::info!(data = %data, "ticker message"),
        other => tracing::debug!(kind = other, "ignoring ticker text message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(6), Duration::from_secs(32));
        assert_eq!(policy.delay(7), Duration::from_secs(60));
        assert_eq!(policy.delay(50), Duration::from_secs(60));
    }
}
