use super::MirrorContext;
use tickmirror_domain::repositories::market_feed::{FeedControl, FeedHandler};
use tickmirror_domain::services::row_layout::{tick_row, RowPayload};
use tickmirror_domain::value_objects::feed_mode::FeedMode;
use tickmirror_domain::value_objects::tick::Tick;

/// Source of the processing-time stamp written in the last column.
pub trait Clock: Send + Sync {
    fn now_display(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now_display(&self) -> String {
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Feed callbacks: maps ticks to worksheet rows and stages them in the
/// update buffer.
pub struct TickHandler<C: Clock = LocalClock> {
    ctx: MirrorContext,
    mode: FeedMode,
    clock: C,
}

impl TickHandler<LocalClock> {
    pub fn new(ctx: MirrorContext, mode: FeedMode) -> Self {
        Self::with_clock(ctx, mode, LocalClock)
    }
}

impl<C: Clock> TickHandler<C> {
    pub fn with_clock(ctx: MirrorContext, mode: FeedMode, clock: C) -> Self {
        Self { ctx, mode, clock }
    }

    /// Buffers every mapped tick of the batch, or none of them if any tick is
    /// malformed. Returns the number of rows buffered.
    pub fn process_batch(&self, ticks: &[Tick]) -> Result<usize, String> {
        let mut staged: Vec<(u32, u32, RowPayload)> = Vec::with_capacity(ticks.len());
        let mut unmapped = 0u64;
        for tick in ticks {
            let Some(row) = self.ctx.rows.row_for(tick.token) else {
                unmapped += 1;
                continue;
            };
            let symbol = self
                .ctx
                .rows
                .symbol_for(tick.token)
                .ok_or_else(|| format!("no trading symbol for token {}", tick.token))?;
            let payload = tick_row(tick, symbol, &self.clock.now_display())?;
            staged.push((tick.token, row, payload));
        }

        if unmapped > 0 {
            metrics::counter!("tickmirror.feed.unmapped_total").increment(unmapped);
        }
        let buffered = staged.len();
        for (token, row, payload) in staged {
            self.ctx.buffer.buffer_update(row, payload);
            tracing::debug!(row, token, "buffered row");
        }
        metrics::counter!("tickmirror.feed.ticks_total").increment(buffered as u64);
        Ok(buffered)
    }
}

impl<C: Clock> FeedHandler for TickHandler<C> {
    fn on_connect(&self, control: &mut dyn FeedControl) {
        let tokens = self.ctx.tokens();
        if let Err(err) = control.subscribe(&tokens) {
            tracing::error!(error = %err, "failed to subscribe instruments");
            return;
        }
        if let Err(err) = control.set_mode(self.mode, &tokens) {
            tracing::error!(error = %err, mode = %self.mode, "failed to set streaming mode");
            return;
        }
        tracing::info!(
            instruments = tokens.len(),
            mode = %self.mode,
            "websocket connected and subscribed to instruments"
        );
    }

    fn on_ticks(&self, ticks: &[Tick]) {
        tracing::info!(count = ticks.len(), "received ticks");
        if let Err(err) = self.process_batch(ticks) {
            metrics::counter!("tickmirror.feed.batches_dropped_total").increment(1);
            tracing::error!(error = %err, count = ticks.len(), "error in on_ticks, batch dropped");
        }
    }

    fn on_close(&self, code: u16, reason: &str) {
        tracing::warn!(code, reason, "websocket closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickmirror_domain::repositories::market_feed::FeedError;
    use tickmirror_domain::value_objects::instrument::Instrument;
    use tickmirror_domain::value_objects::row_assignment::RowAssignment;
    use tickmirror_domain::value_objects::sheet_value::SheetValue;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now_display(&self) -> String {
            "2024-01-02 09:15:00".to_string()
        }
    }

    fn handler() -> TickHandler<FixedClock> {
        let instruments = vec![Instrument::new(408065, "INFY"), Instrument::new(2953217, "TCS")];
        let rows = RowAssignment::sequential(&instruments);
        TickHandler::with_clock(MirrorContext::new(instruments, rows), FeedMode::Full, FixedClock)
    }

    fn priced(token: u32, price: f64) -> Tick {
        let mut tick = Tick::new(token);
        tick.last_price = Some(price);
        tick
    }

    #[test]
    fn unmapped_tokens_leave_buffer_untouched() {
        let handler = handler();
        handler.on_ticks(&[priced(408065, 1500.0)]);
        let seeded = handler.ctx.buffer.drain();
        for (row, payload) in &seeded {
            handler.ctx.buffer.buffer_update(*row, payload.clone());
        }

        handler.on_ticks(&[priced(999, 10.0), priced(12345, 1.0)]);

        assert_eq!(handler.ctx.buffer.drain(), seeded);
        assert_eq!(seeded.len(), 1);
    }

    #[test]
    fn repeated_ticks_keep_only_latest_payload() {
        let handler = handler();
        handler.on_ticks(&[priced(408065, 1500.0)]);
        handler.on_ticks(&[priced(408065, 1501.0), priced(408065, 1502.5)]);

        let drained = handler.ctx.buffer.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[&2][2], SheetValue::Float(1502.5));
        assert_eq!(drained[&2][1], SheetValue::text("INFY"));
        assert_eq!(drained[&2][10], SheetValue::text("2024-01-02 09:15:00"));
    }

    #[test]
    fn malformed_tick_drops_the_whole_batch() {
        let handler = handler();
        handler.on_ticks(&[priced(408065, 1500.0), priced(2953217, f64::INFINITY)]);
        assert!(handler.ctx.buffer.is_empty());

        handler.on_ticks(&[priced(2953217, 3900.0)]);
        assert_eq!(handler.ctx.buffer.drain().keys().copied().collect::<Vec<_>>(), vec![3]);
    }

    #[derive(Default)]
    struct RecordingControl {
        subscribed: Vec<u32>,
        mode: Option<(FeedMode, Vec<u32>)>,
        fail_subscribe: bool,
    }

    impl FeedControl for RecordingControl {
        fn subscribe(&mut self, tokens: &[u32]) -> Result<(), FeedError> {
            if self.fail_subscribe {
                return Err(FeedError::Disconnected("socket gone".to_string()));
            }
            self.subscribed = tokens.to_vec();
            Ok(())
        }

        fn set_mode(&mut self, mode: FeedMode, tokens: &[u32]) -> Result<(), FeedError> {
            self.mode = Some((mode, tokens.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn on_connect_subscribes_all_tokens_in_full_mode() {
        let handler = handler();
        let mut control = RecordingControl::default();
        handler.on_connect(&mut control);
        assert_eq!(control.subscribed, vec![408065, 2953217]);
        assert_eq!(control.mode, Some((FeedMode::Full, vec![408065, 2953217])));
    }

    #[test]
    fn on_connect_skips_mode_when_subscribe_fails() {
        let handler = handler();
        let mut control = RecordingControl {
            fail_subscribe: true,
            ..RecordingControl::default()
        };
        handler.on_connect(&mut control);
        assert!(control.mode.is_none());
    }
}
