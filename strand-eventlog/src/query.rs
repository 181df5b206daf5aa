//! Event Querying

use crate::log::EventLog;
use crate::types::{CommittedEvent, EventLogError, GlobalPage, Result};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cursor value reported for a page with no events.
///
/// Callers resume from a position they already know; an empty page at the
/// tail therefore repeats the same `(empty, 1)` answer until new data lands.
pub const EMPTY_PAGE_POSITION: u64 = 1;

impl EventLog {
    /// Load an aggregate's full stream, ordered by aggregate sequence number.
    ///
    /// Unknown aggregates yield an empty list.
    pub async fn load_stream(
        &self,
        aggregate_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<CommittedEvent>> {
        let state = self.lock(cancel).await?;

        let events: Vec<CommittedEvent> = state
            .streams
            .get(aggregate_id)
            .map(|stream| stream.iter().map(|e| CommittedEvent::clone(e)).collect())
            .unwrap_or_default();

        debug!(aggregate_id = %aggregate_id, count = events.len(), "Stream loaded");
        Ok(events)
    }

    /// Load every live event with `start <= global_sequence_number <= end`,
    /// across all aggregates.
    ///
    /// The page is a point-in-time view taken inside a short critical
    /// section. `next_position` is the highest position returned, or
    /// [`EMPTY_PAGE_POSITION`] when nothing matched.
    pub async fn load_global_range(
        &self,
        start: u64,
        end: u64,
        cancel: &CancellationToken,
    ) -> Result<GlobalPage> {
        if cancel.is_cancelled() {
            debug!(start, end, "Global range load cancelled");
            return Err(EventLogError::Cancelled);
        }

        if start > end {
            return Ok(GlobalPage {
                events: Vec::new(),
                next_position: EMPTY_PAGE_POSITION,
            });
        }

        let events: Vec<CommittedEvent> = {
            let state = self.lock(cancel).await?;
            state
                .by_position
                .range(start..=end)
                .map(|(_, e)| CommittedEvent::clone(e))
                .collect()
        };

        let next_position = events
            .iter()
            .map(|e| e.global_sequence_number)
            .max()
            .unwrap_or(EMPTY_PAGE_POSITION);

        debug!(start, end, count = events.len(), next_position, "Global range loaded");
        Ok(GlobalPage { events, next_position })
    }
}
