mod common;

use common::{LogCapture, MemoryWorksheet};
use std::sync::Arc;
use std::time::Duration;
use tickmirror_application::streaming::{BatchFlusher, FlushOutcome, UpdateBuffer};
use tickmirror_domain::services::row_layout::placeholder_row;
use tickmirror_domain::value_objects::sheet_value::SheetValue;

fn buffer_with_rows(rows: &[u32]) -> Arc<UpdateBuffer> {
    let buffer = Arc::new(UpdateBuffer::new());
    for row in rows {
        buffer.buffer_update(*row, placeholder_row(*row * 100, "SYM"));
    }
    buffer
}

#[test]
fn flush_writes_one_range_update_per_row() {
    let buffer = buffer_with_rows(&[4, 2, 3]);
    let worksheet = Arc::new(MemoryWorksheet::new("Live Data"));
    let flusher = BatchFlusher::new(buffer.clone(), worksheet.clone(), Duration::from_secs(30));

    assert_eq!(flusher.flush_once(), FlushOutcome::Flushed { rows: 3 });

    let ranges: Vec<String> = worksheet.updates.lock().iter().map(|(r, _)| r.clone()).collect();
    assert_eq!(ranges, vec!["A2:K2", "A3:K3", "A4:K4"]);
    assert!(buffer.is_empty());
}

#[test]
fn empty_buffer_is_idle() {
    let worksheet = Arc::new(MemoryWorksheet::new("Live Data"));
    let flusher = BatchFlusher::new(Arc::new(UpdateBuffer::new()), worksheet.clone(), Duration::from_secs(30));
    let logs = LogCapture::default();

    assert_eq!(logs.scope(|| flusher.flush_once()), FlushOutcome::Idle);
    assert_eq!(worksheet.update_calls(), 0);
    assert!(logs.lines().iter().any(|l| l.contains("no data to update")));
}

#[test]
fn failure_mid_cycle_discards_remaining_rows_and_logs_once() {
    let buffer = buffer_with_rows(&[2, 3, 4]);
    let worksheet = Arc::new(MemoryWorksheet::failing_on("Live Data", 2));
    let flusher = BatchFlusher::new(buffer.clone(), worksheet.clone(), Duration::from_secs(30));
    let logs = LogCapture::default();

    let outcome = logs.scope(|| flusher.flush_once());

    match outcome {
        FlushOutcome::Failed { written, drained, error } => {
            assert_eq!(written, 1);
            assert_eq!(drained, 3);
            assert!(error.contains("quota"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(buffer.is_empty());
    assert_eq!(worksheet.update_calls(), 2);
    assert_eq!(worksheet.updates.lock().len(), 1);
    assert_eq!(logs.count_level("ERROR"), 1);

    // The lost rows are not retried on the next cycle.
    assert_eq!(flusher.flush_once(), FlushOutcome::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_loop_flushes_on_interval() {
    let buffer = buffer_with_rows(&[2]);
    let worksheet = Arc::new(MemoryWorksheet::new("Live Data"));
    let flusher = Arc::new(BatchFlusher::new(
        buffer.clone(),
        worksheet.clone(),
        Duration::from_millis(20),
    ));
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let task = tokio::spawn(flusher.run(shutdown_rx));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while worksheet.updates.lock().is_empty() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(worksheet.updates.lock().len(), 1);

    shutdown_tx.send(true).unwrap();
    task.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_performs_final_flush() {
    let buffer = Arc::new(UpdateBuffer::new());
    let worksheet = Arc::new(MemoryWorksheet::new("Live Data"));
    let flusher = Arc::new(BatchFlusher::new(
        buffer.clone(),
        worksheet.clone(),
        Duration::from_secs(3600),
    ));
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let task = tokio::spawn(flusher.run(shutdown_rx));

    buffer.buffer_update(7, vec![SheetValue::Int(1)]);
    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("flusher should stop")
        .unwrap();

    let updates = worksheet.updates.lock().clone();
    assert_eq!(updates, vec![("A7:K7".to_string(), vec![vec![SheetValue::Int(1)]])]);
    assert!(buffer.is_empty());
}
