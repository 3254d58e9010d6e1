use parking_lot::Mutex;
use std::collections::BTreeMap;
use tickmirror_domain::services::row_layout::RowPayload;

/// Latest pending payload per worksheet row.
///
/// The lock is held only for the map mutation; callers do their network I/O
/// on the drained copy.
#[derive(Debug, Default)]
pub struct UpdateBuffer {
    pending: Mutex<BTreeMap<u32, RowPayload>>,
}

impl UpdateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever is pending for `row`.
    pub fn buffer_update(&self, row: u32, payload: RowPayload) {
        self.pending.lock().insert(row, payload);
    }

    /// Takes every pending entry, leaving the buffer empty. Ordered by row.
    pub fn drain(&self) -> BTreeMap<u32, RowPayload> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickmirror_domain::value_objects::sheet_value::SheetValue;

    fn payload(price: f64) -> RowPayload {
        vec![SheetValue::from(price)]
    }

    #[test]
    fn last_write_wins_per_row() {
        let buffer = UpdateBuffer::new();
        buffer.buffer_update(2, payload(1.0));
        buffer.buffer_update(3, payload(5.0));
        buffer.buffer_update(2, payload(2.0));

        let drained = buffer.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[&2], payload(2.0));
        assert_eq!(drained[&3], payload(5.0));
    }

    #[test]
    fn second_drain_is_empty() {
        let buffer = UpdateBuffer::new();
        buffer.buffer_update(4, payload(1.0));
        assert_eq!(buffer.drain().len(), 1);
        assert!(buffer.drain().is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn concurrent_writers_never_lose_distinct_rows() {
        let buffer = std::sync::Arc::new(UpdateBuffer::new());
        let handles: Vec<_> = (0..4u32)
            .map(|t| {
                let buffer = buffer.clone();
                std::thread::spawn(move || {
                    for i in 0..100u32 {
                        buffer.buffer_update(2 + t, payload(f64::from(i)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let drained = buffer.drain();
        assert_eq!(drained.len(), 4);
        assert!(drained.values().all(|p| *p == payload(99.0)));
    }
}
