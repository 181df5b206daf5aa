//! Stream catalog: per-aggregate summary of everything seen in the log.
//!
//! Append-only view. Deleted streams keep their last summary because the
//! global scan carries no deletion records.

use crate::apply::Projection;
use crate::error::{ProjectionError, Result};
use std::collections::{BTreeMap, HashMap};
use strand_eventlog::CommittedEvent;

/// Summary of one aggregate's stream as observed by the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    pub aggregate_name: String,
    /// Highest aggregate sequence number applied
    pub version: u64,
    /// Global position of the latest applied event
    pub last_position: u64,
}

/// Catalog projection keyed by aggregate id
#[derive(Debug, Default)]
pub struct StreamCatalog {
    streams: HashMap<String, StreamSummary>,
    by_type: BTreeMap<String, u64>,
}

impl StreamCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, aggregate_id: &str) -> Option<&StreamSummary> {
        self.streams.get(aggregate_id)
    }

    /// Number of events applied for one aggregate
    pub fn events_for(&self, aggregate_id: &str) -> u64 {
        self.streams.get(aggregate_id).map_or(0, |s| s.version)
    }

    /// Event counts grouped by aggregate type name
    pub fn counts_by_type(&self) -> &BTreeMap<String, u64> {
        &self.by_type
    }

    pub fn total_events(&self) -> u64 {
        self.by_type.values().sum()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }
}

impl Projection for StreamCatalog {
    fn name(&self) -> &str {
        "stream_catalog"
    }

    fn apply(&mut self, event: &CommittedEvent) -> Result<()> {
        let current = self.events_for(&event.aggregate_id);

        // A stream recreated after deletion restarts at 1
        let restarted = event.aggregate_sequence_number == 1;
        if !restarted && event.aggregate_sequence_number != current + 1 {
            return Err(ProjectionError::apply(
                self.name(),
                event,
                format!(
                    "aggregate {} jumped from version {} to {}",
                    event.aggregate_id, current, event.aggregate_sequence_number
                ),
            ));
        }

        self.streams.insert(
            event.aggregate_id.clone(),
            StreamSummary {
                aggregate_name: event.aggregate_name.clone(),
                version: event.aggregate_sequence_number,
                last_position: event.global_sequence_number,
            },
        );
        *self.by_type.entry(event.aggregate_name.clone()).or_insert(0) += 1;

        Ok(())
    }
}
