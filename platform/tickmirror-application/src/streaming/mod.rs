mod buffer;
mod flusher;
mod handler;

pub use buffer::UpdateBuffer;
pub use flusher::{BatchFlusher, FlushOutcome};
pub use handler::{Clock, LocalClock, TickHandler};

use std::sync::Arc;
use tickmirror_domain::value_objects::instrument::Instrument;
use tickmirror_domain::value_objects::row_assignment::RowAssignment;

/// State shared by the tick handler and the flusher.
///
/// `instruments` and `rows` are fixed at startup; only `buffer` is mutated
/// while streaming.
#[derive(Clone)]
pub struct MirrorContext {
    pub instruments: Arc<[Instrument]>,
    pub rows: Arc<RowAssignment>,
    pub buffer: Arc<UpdateBuffer>,
}

impl MirrorContext {
    pub fn new(instruments: Vec<Instrument>, rows: RowAssignment) -> Self {
        Self {
            instruments: instruments.into(),
            rows: Arc::new(rows),
            buffer: Arc::new(UpdateBuffer::new()),
        }
    }

    pub fn tokens(&self) -> Vec<u32> {
        self.instruments.iter().map(|i| i.token).collect()
    }
}
