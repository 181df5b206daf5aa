//! Integration tests for event log ordering, atomicity and concurrency.

use std::collections::HashSet;
use std::sync::Arc;

use strand_eventlog::{EventLog, EventLogError, EMPTY_PAGE_POSITION};
use strand_testkit::{batch_from, init_test_tracing, seed_stream, SeedOptions};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_stream_sequence_is_contiguous_across_appends() {
    init_test_tracing();
    let log = EventLog::new();
    let cancel = CancellationToken::new();

    // 3 appends totaling 6 events
    log.append("order-1", "Order", batch_from(1, 1), &cancel).await.unwrap();
    log.append("order-1", "Order", batch_from(2, 3), &cancel).await.unwrap();
    log.append("order-1", "Order", batch_from(5, 2), &cancel).await.unwrap();

    let stream = log.load_stream("order-1", &cancel).await.unwrap();
    let seqs: Vec<u64> = stream.iter().map(|e| e.aggregate_sequence_number).collect();
    assert_eq!(seqs, (1..=6).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_global_positions_unique_and_increasing() {
    init_test_tracing();
    let log = EventLog::new();
    let cancel = CancellationToken::new();

    let mut committed = Vec::new();
    for round in 0..4u64 {
        for id in ["a", "b", "c"] {
            committed.extend(
                log.append(id, "Letter", batch_from(round * 2 + 1, 2), &cancel)
                    .await
                    .unwrap(),
            );
        }
    }

    let positions: Vec<u64> = committed.iter().map(|e| e.global_sequence_number).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "commit order must be increasing");
    assert_eq!(positions, (1..=24).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_conflicting_batch_leaves_no_trace() {
    init_test_tracing();
    let log = EventLog::new();
    let cancel = CancellationToken::new();

    seed_stream(&log, SeedOptions::new("order-1", 2)).await.unwrap();

    // A stale writer still believes the stream has one event
    let err = log
        .append("order-1", "Order", batch_from(2, 3), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, EventLogError::ConcurrencyConflict { expected: 3, actual: 2, .. }));
    assert_eq!(log.load_stream("order-1", &cancel).await.unwrap().len(), 2);
    assert_eq!(log.last_global_position(&cancel).await.unwrap(), 2);
}

#[tokio::test]
async fn test_first_append_must_start_at_one() {
    init_test_tracing();
    let log = EventLog::new();
    let cancel = CancellationToken::new();

    let result = log.append("order-1", "Order", batch_from(2, 1), &cancel).await;

    assert!(matches!(result, Err(EventLogError::ConcurrencyConflict { expected: 1, actual: 2, .. })));
    assert!(log.load_stream("order-1", &cancel).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_then_reload_and_restart() {
    init_test_tracing();
    let log = EventLog::new();
    let cancel = CancellationToken::new();

    seed_stream(&log, SeedOptions::new("order-1", 3)).await.unwrap();

    assert_eq!(log.delete_stream("order-1", &cancel).await.unwrap(), 3);
    assert!(log.load_stream("order-1", &cancel).await.unwrap().is_empty());

    let committed = log.append("order-1", "Order", batch_from(1, 1), &cancel).await.unwrap();
    assert_eq!(committed[0].aggregate_sequence_number, 1);
    assert_eq!(committed[0].global_sequence_number, 4, "positions are never reused");
}

#[tokio::test]
async fn test_tail_scan_on_empty_log_is_idempotent() {
    init_test_tracing();
    let log = EventLog::new();
    let cancel = CancellationToken::new();

    let first = log.load_global_range(1, 1000, &cancel).await.unwrap();
    let second = log.load_global_range(1, 1000, &cancel).await.unwrap();

    assert!(first.events.is_empty());
    assert_eq!(first.next_position, EMPTY_PAGE_POSITION);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_range_scan_returns_exact_window() {
    init_test_tracing();
    let log = EventLog::new();
    let cancel = CancellationToken::new();

    // Positions 1..=10 spread over two aggregates
    seed_stream(&log, SeedOptions::new("a", 4).in_batches_of(2)).await.unwrap();
    seed_stream(&log, SeedOptions::new("b", 6).in_batches_of(3)).await.unwrap();

    let page = log.load_global_range(3, 7, &cancel).await.unwrap();
    assert_eq!(page.next_position, 7);

    let positions: Vec<u64> = page.into_sorted().iter().map(|e| e.global_sequence_number).collect();
    assert_eq!(positions, vec![3, 4, 5, 6, 7]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_writers_to_distinct_aggregates() {
    init_test_tracing();
    let log = Arc::new(EventLog::new());
    let writers = 64;

    let handles: Vec<_> = (0..writers)
        .map(|i| {
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let cancel = CancellationToken::new();
                log.append(&format!("agg-{}", i), "Parallel", batch_from(1, 1), &cancel)
                    .await
            })
        })
        .collect();

    let mut positions = HashSet::new();
    for handle in handles {
        let committed = handle.await.unwrap().expect("distinct aggregates never conflict");
        assert_eq!(committed.len(), 1);
        assert!(positions.insert(committed[0].global_sequence_number), "duplicate position");
    }

    assert_eq!(positions.len(), writers);
    assert_eq!(positions.iter().copied().max(), Some(writers as u64));
    assert_eq!(positions.iter().copied().min(), Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_writers_on_one_aggregate_exactly_one_wins() {
    init_test_tracing();
    let log = Arc::new(EventLog::new());
    let racers = 16;

    let handles: Vec<_> = (0..racers)
        .map(|_| {
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let cancel = CancellationToken::new();
                log.append("hot", "Contended", batch_from(1, 2), &cancel).await
            })
        })
        .collect();

    let mut winners = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(EventLogError::ConcurrencyConflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(conflicts, racers - 1);

    let cancel = CancellationToken::new();
    assert_eq!(log.load_stream("hot", &cancel).await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scan_during_appends_never_duplicates() {
    init_test_tracing();
    let log = Arc::new(EventLog::new());
    let cancel = CancellationToken::new();

    seed_stream(&log, SeedOptions::new("before", 20)).await.unwrap();

    let writer = {
        let log = Arc::clone(&log);
        tokio::spawn(async move {
            let cancel = CancellationToken::new();
            for i in 0..50 {
                log.append(&format!("during-{}", i), "Writer", batch_from(1, 2), &cancel)
                    .await
                    .unwrap();
            }
        })
    };

    for _ in 0..20 {
        let page = log.load_global_range(1, 10_000, &cancel).await.unwrap();
        let mut seen = HashSet::new();
        for event in &page.events {
            assert!(seen.insert(event.global_sequence_number), "duplicate in page");
        }
        // Everything that existed before the scan started is present
        assert!((1..=20).all(|p| seen.contains(&p)));
        tokio::task::yield_now().await;
    }

    writer.await.unwrap();
    let page = log.load_global_range(1, 10_000, &cancel).await.unwrap();
    assert_eq!(page.events.len(), 120);
    assert_eq!(page.next_position, 120);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stream_reads_see_whole_batches_only() {
    init_test_tracing();
    let log = Arc::new(EventLog::new());
    let cancel = CancellationToken::new();
    let batches = 40;
    let batch_len = 5;

    let writer = {
        let log = Arc::clone(&log);
        tokio::spawn(async move {
            let cancel = CancellationToken::new();
            for round in 0..batches {
                log.append("ledger-1", "Ledger", batch_from(round * batch_len + 1, batch_len), &cancel)
                    .await
                    .unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    loop {
        let done = writer.is_finished();
        let stream = log.load_stream("ledger-1", &cancel).await.unwrap();

        assert_eq!(stream.len() as u64 % batch_len, 0, "partial batch visible");
        assert!(stream
            .iter()
            .enumerate()
            .all(|(i, e)| e.aggregate_sequence_number == i as u64 + 1));

        // Each batch id covers one aligned run of `batch_len` events
        let mut batch_ids = HashSet::new();
        for chunk in stream.chunks(batch_len as usize) {
            assert!(chunk.iter().all(|e| e.batch_id == chunk[0].batch_id));
            assert!(batch_ids.insert(chunk[0].batch_id), "batch split across snapshot");
        }

        if done {
            assert_eq!(stream.len() as u64, batches * batch_len);
            break;
        }
        tokio::task::yield_now().await;
    }

    writer.await.unwrap();
}

#[tokio::test]
async fn test_cancelled_append_changes_nothing() {
    init_test_tracing();
    let log = EventLog::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = log.append("order-1", "Order", batch_from(1, 3), &cancel).await;
    assert_eq!(result, Err(EventLogError::Cancelled));

    let fresh = CancellationToken::new();
    assert_eq!(log.event_count(&fresh).await.unwrap(), 0);
    assert_eq!(log.last_global_position(&fresh).await.unwrap(), 0);
}

#[tokio::test]
async fn test_every_read_operation_honours_cancellation() {
    let log = EventLog::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    assert_eq!(log.load_stream("a", &cancel).await, Err(EventLogError::Cancelled));
    assert_eq!(log.load_global_range(1, 5, &cancel).await, Err(EventLogError::Cancelled));
    assert_eq!(log.delete_stream("a", &cancel).await, Err(EventLogError::Cancelled));
    assert_eq!(log.stream_version("a", &cancel).await, Err(EventLogError::Cancelled));
}
