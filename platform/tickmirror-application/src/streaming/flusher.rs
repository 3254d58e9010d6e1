use super::UpdateBuffer;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tickmirror_domain::repositories::spreadsheet::Worksheet;
use tickmirror_domain::services::row_layout::row_range;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was pending.
    Idle,
    Flushed { rows: usize },
    /// The cycle stopped at the first failing row; the rest of the drained
    /// rows were discarded with it.
    Failed {
        written: usize,
        drained: usize,
        error: String,
    },
}

/// Periodically drains the update buffer into the worksheet, one range update
/// per row.
pub struct BatchFlusher {
    buffer: Arc<UpdateBuffer>,
    worksheet: Arc<dyn Worksheet>,
    interval: Duration,
}

impl BatchFlusher {
    pub fn new(buffer: Arc<UpdateBuffer>, worksheet: Arc<dyn Worksheet>, interval: Duration) -> Self {
        Self {
            buffer,
            worksheet,
            interval,
        }
    }

    /// One flushing cycle. The buffer is drained before any remote call, so a
    /// failed cycle never leaves its rows behind for a retry.
    pub fn flush_once(&self) -> FlushOutcome {
        let pending = self.buffer.drain();
        if pending.is_empty() {
            tracing::info!("no data to update, waiting for next cycle");
            return FlushOutcome::Idle;
        }

        let start = Instant::now();
        let drained = pending.len();
        let mut written = 0usize;
        for (row, payload) in pending {
            let range = row_range(row);
            if let Err(err) = self.worksheet.update(&range, &[payload]) {
                metrics::counter!("tickmirror.flush.errors_total").increment(1);
                metrics::counter!("tickmirror.flush.rows_total").increment(written as u64);
                tracing::error!(
                    range = %range,
                    written,
                    drained,
                    error = %err,
                    "error during batch update"
                );
                return FlushOutcome::Failed {
                    written,
                    drained,
                    error: err,
                };
            }
            written += 1;
        }

        metrics::counter!("tickmirror.flush.rows_total").increment(written as u64);
        metrics::histogram!("tickmirror.flush.cycle_ms").record(start.elapsed().as_millis() as f64);
        tracing::info!(rows = written, "batch update completed");
        FlushOutcome::Flushed { rows: written }
    }

    /// Waits one interval, flushes, repeats. Returns after a final flush once
    /// `shutdown` turns true or its sender is dropped.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.interval.as_secs_f64(), "batch flusher started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush_blocking().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_ok() && !*shutdown.borrow() {
                        continue;
                    }
                    tracing::info!(pending = self.buffer.len(), "batch flusher stopping, final flush");
                    self.flush_blocking().await;
                    break;
                }
            }
        }
    }

    async fn flush_blocking(self: &Arc<Self>) -> FlushOutcome {
        let this = Arc::clone(self);
        match tokio::task::spawn_blocking(move || this.flush_once()).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(error = %err, "flush task panicked");
                FlushOutcome::Failed {
                    written: 0,
                    drained: 0,
                    error: format!("flush task failed: {err}"),
                }
            }
        }
    }
}
