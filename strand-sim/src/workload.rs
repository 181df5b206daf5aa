//! Writer workload and conflict retry.
//!
//! Writers play the aggregate-persistence role: they read the current
//! stream version, number their batch from it and append. A conflict means
//! another writer got there first; the writer reloads and tries again.

use crate::config::WorkloadConfig;
use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strand_eventlog::{CommittedEvent, EventLog, EventLogError, EventStore, SerializedEvent};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Domain events produced by simulated writers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimEvent {
    Incremented { by: u64 },
    Tagged { label: String },
}

/// Metadata attached to every simulated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimMetadata {
    pub writer: usize,
    pub correlation_id: Uuid,
}

/// What one writer achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterReport {
    pub events_appended: u64,
    pub conflicts: u64,
}

/// Append `payloads` to the aggregate, renumbering and retrying on conflict.
///
/// Returns the committed events and how many conflicts were absorbed.
pub async fn append_with_retry(
    store: &dyn EventStore,
    aggregate_id: &str,
    aggregate_name: &str,
    payloads: &[SerializedEvent],
    max_attempts: u32,
    cancel: &CancellationToken,
) -> SimResult<(Vec<CommittedEvent>, u64)> {
    let mut conflicts = 0;

    for attempt in 1..=max_attempts {
        let version = store.stream_version(aggregate_id, cancel).await?;
        let batch = renumber(payloads, version + 1);

        match store.append(aggregate_id, aggregate_name, batch, cancel).await {
            Ok(committed) => return Ok((committed, conflicts)),
            Err(EventLogError::ConcurrencyConflict { expected, actual, .. }) => {
                conflicts += 1;
                debug!(
                    aggregate_id = %aggregate_id,
                    attempt,
                    expected,
                    actual,
                    "Conflict, reloading stream version"
                );
                tokio::task::yield_now().await;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(SimError::RetriesExhausted {
        aggregate_id: aggregate_id.to_string(),
        attempts: max_attempts,
    })
}

/// Copy payloads, assigning contiguous sequence numbers from `first`.
fn renumber(payloads: &[SerializedEvent], first: u64) -> Vec<SerializedEvent> {
    payloads
        .iter()
        .enumerate()
        .map(|(i, event)| SerializedEvent {
            aggregate_sequence_number: first + i as u64,
            ..event.clone()
        })
        .collect()
}

/// Serialize one writer batch; sequence numbers are filled in on append.
pub fn build_batch(writer: usize, round: usize, size: u64) -> SimResult<Vec<SerializedEvent>> {
    let metadata = serde_json::to_string(&SimMetadata {
        writer,
        correlation_id: Uuid::new_v4(),
    })?;

    (0..size)
        .map(|i| -> SimResult<SerializedEvent> {
            let event = if i % 2 == 0 {
                SimEvent::Incremented { by: round as u64 + 1 }
            } else {
                SimEvent::Tagged {
                    label: format!("w{}-r{}", writer, round),
                }
            };
            Ok(SerializedEvent::new(0, serde_json::to_string(&event)?).with_metadata(metadata.clone()))
        })
        .collect()
}

/// Aggregate a writer targets in a given round.
///
/// Even rounds go to the writer's own aggregate, odd rounds to a shared one.
pub fn target_aggregate(config: &WorkloadConfig, writer: usize, round: usize) -> (String, &'static str) {
    if config.shared_aggregates > 0 && round % 2 == 1 {
        let shared = (writer + round) % config.shared_aggregates;
        (format!("shared-{}", shared), "SharedCounter")
    } else {
        (format!("writer-{}", writer), "Counter")
    }
}

/// Run one writer to completion.
pub async fn run_writer(
    log: Arc<EventLog>,
    config: WorkloadConfig,
    writer: usize,
    cancel: CancellationToken,
) -> SimResult<WriterReport> {
    let mut report = WriterReport::default();

    for round in 0..config.batches_per_writer {
        let (aggregate_id, aggregate_name) = target_aggregate(&config, writer, round);
        let payloads = build_batch(writer, round, config.batch_size)?;

        let (committed, conflicts) = append_with_retry(
            log.as_ref(),
            &aggregate_id,
            aggregate_name,
            &payloads,
            config.max_attempts,
            &cancel,
        )
        .await?;

        report.events_appended += committed.len() as u64;
        report.conflicts += conflicts;
    }

    debug!(writer, events = report.events_appended, conflicts = report.conflicts, "Writer finished");
    Ok(report)
}
