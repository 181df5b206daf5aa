//! Test helper functions for building batches and seeding streams.

use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use strand_eventlog::{CommittedEvent, EventLog, Result, SerializedEvent};

/// Options for a seeded stream.
pub struct SeedOptions {
    /// Aggregate id (e.g., "order-1")
    pub aggregate_id: String,
    /// Aggregate type name (defaults to "TestAggregate")
    pub aggregate_name: String,
    /// Total number of events to append
    pub events: u64,
    /// Events per append call (defaults to all in one batch)
    pub batch_size: Option<u64>,
}

impl SeedOptions {
    pub fn new(aggregate_id: impl Into<String>, events: u64) -> Self {
        Self {
            aggregate_id: aggregate_id.into(),
            aggregate_name: "TestAggregate".to_string(),
            events,
            batch_size: None,
        }
    }

    pub fn named(mut self, aggregate_name: impl Into<String>) -> Self {
        self.aggregate_name = aggregate_name.into();
        self
    }

    pub fn in_batches_of(mut self, batch_size: u64) -> Self {
        self.batch_size = Some(batch_size.max(1));
        self
    }
}

/// Serialize a domain value into a batch entry, with a small JSON metadata blob.
pub fn json_event<T: Serialize>(aggregate_sequence_number: u64, payload: &T) -> SerializedEvent {
    let data = serde_json::to_string(payload).unwrap_or_else(|_| "null".to_string());
    let metadata = json!({ "schema_version": 1 }).to_string();
    SerializedEvent::new(aggregate_sequence_number, data).with_metadata(metadata)
}

/// Build `count` events claiming sequence numbers `start, start + 1, ...`.
pub fn batch_from(start: u64, count: u64) -> Vec<SerializedEvent> {
    (start..start + count)
        .map(|seq| json_event(seq, &json!({ "type": "TestEvent", "n": seq })))
        .collect()
}

/// Append `options.events` contiguous events to a stream that is currently empty.
///
/// Returns every committed event in commit order.
pub async fn seed_stream(log: &EventLog, options: SeedOptions) -> Result<Vec<CommittedEvent>> {
    let cancel = CancellationToken::new();
    let batch_size = options.batch_size.unwrap_or(options.events.max(1));

    let mut committed = Vec::with_capacity(options.events as usize);
    let mut next = 1;
    while next <= options.events {
        let count = batch_size.min(options.events - next + 1);
        let batch = batch_from(next, count);
        committed.extend(
            log.append(&options.aggregate_id, &options.aggregate_name, batch, &cancel)
                .await?,
        );
        next += count;
    }

    Ok(committed)
}

/// Seed one single-event stream per id, in the given order.
pub async fn seed_single_events(log: &EventLog, aggregate_ids: &[&str]) -> Result<()> {
    for aggregate_id in aggregate_ids {
        seed_stream(log, SeedOptions::new(*aggregate_id, 1)).await?;
    }
    Ok(())
}
