//! Event Appending with Optimistic Concurrency

use crate::log::EventLog;
use crate::types::{BatchId, CommittedEvent, EventLogError, LogNotification, Result, SerializedEvent};
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

impl EventLog {
    /// Append a batch of events to one aggregate's stream.
    ///
    /// # Arguments
    /// * `aggregate_id` - Stream key of the aggregate instance
    /// * `aggregate_name` - Aggregate type, kept for diagnostics
    /// * `batch` - Events in order, each claiming its stream sequence number
    /// * `cancel` - Aborts the wait for the exclusive section
    ///
    /// # Returns
    /// The committed events in batch order. An empty batch commits nothing
    /// and returns an empty list.
    ///
    /// # Errors
    /// - `ConcurrencyConflict` if the batch does not continue the stream
    ///   exactly at its current tail. Nothing is committed.
    /// - `Cancelled` if `cancel` fires before the batch is committed
    pub async fn append(
        &self,
        aggregate_id: &str,
        aggregate_name: &str,
        batch: Vec<SerializedEvent>,
        cancel: &CancellationToken,
    ) -> Result<Vec<CommittedEvent>> {
        if batch.is_empty() {
            debug!(aggregate_id = %aggregate_id, "Empty batch, nothing to append");
            return Ok(Vec::new());
        }

        let mut state = self.lock(cancel).await?;

        // 1. Verify the batch continues the stream, before touching anything
        let current_len = state.stream_len(aggregate_id);
        verify_contiguous(aggregate_id, current_len, &batch)?;

        // 2. Stamp positions and identity
        let batch_id = BatchId::new();
        let committed_at = Utc::now();
        let base = state.last_global_position;

        let committed: Vec<Arc<CommittedEvent>> = batch
            .into_iter()
            .enumerate()
            .map(|(index, event)| {
                Arc::new(CommittedEvent {
                    global_sequence_number: base + index as u64 + 1,
                    batch_id,
                    aggregate_id: aggregate_id.to_string(),
                    aggregate_name: aggregate_name.to_string(),
                    aggregate_sequence_number: event.aggregate_sequence_number,
                    data: event.data,
                    metadata: event.metadata,
                    committed_at,
                })
            })
            .collect();

        // 3. Commit
        let count = committed.len();
        let first_position = base + 1;
        let last_position = base + count as u64;

        state.last_global_position = last_position;
        for event in &committed {
            state.by_position.insert(event.global_sequence_number, Arc::clone(event));
        }
        state
            .streams
            .entry(aggregate_id.to_string())
            .or_default()
            .extend(committed.iter().cloned());

        info!(
            aggregate_id = %aggregate_id,
            aggregate_name = %aggregate_name,
            batch_id = %batch_id,
            count,
            first_position,
            last_position,
            "Batch committed"
        );

        self.notify(LogNotification::Committed {
            aggregate_id: aggregate_id.to_string(),
            batch_id,
            first_position,
            last_position,
            count,
        });

        Ok(committed.iter().map(|e| CommittedEvent::clone(e)).collect())
    }
}

/// Check that the batch claims exactly `current_len + 1, current_len + 2, ...`
fn verify_contiguous(aggregate_id: &str, current_len: u64, batch: &[SerializedEvent]) -> Result<()> {
    for (index, event) in batch.iter().enumerate() {
        let expected = current_len + index as u64 + 1;
        if event.aggregate_sequence_number != expected {
            warn!(
                aggregate_id = %aggregate_id,
                expected,
                actual = event.aggregate_sequence_number,
                batch_index = index,
                "Concurrency conflict, batch rejected"
            );
            return Err(EventLogError::ConcurrencyConflict {
                aggregate_id: aggregate_id.to_string(),
                expected,
                actual: event.aggregate_sequence_number,
            });
        }
    }
    Ok(())
}
