//! Event Log Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier shared by every event committed in one `append` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(Uuid);

impl BatchId {
    /// Generate a fresh random batch id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Event handed to `append` by the persistence layer.
///
/// `data` and `metadata` are produced by the caller's serializer and are
/// never inspected by the log. `aggregate_sequence_number` is the position
/// the caller claims for this event within the aggregate's stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedEvent {
    pub data: String,
    pub metadata: String,
    pub aggregate_sequence_number: u64,
}

impl SerializedEvent {
    /// Create a new event with empty metadata
    pub fn new(aggregate_sequence_number: u64, data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            metadata: String::new(),
            aggregate_sequence_number,
        }
    }

    /// Set serialized metadata
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into();
        self
    }
}

/// Event as stored in the log. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedEvent {
    // Ordering
    pub global_sequence_number: u64,
    pub batch_id: BatchId,

    // Stream Partitioning
    pub aggregate_id: String,
    pub aggregate_name: String,
    pub aggregate_sequence_number: u64,

    // Opaque payload
    pub data: String,
    pub metadata: String,

    // Diagnostics
    pub committed_at: DateTime<Utc>,
}

/// One page of a global scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalPage {
    /// Events in range, not necessarily sorted by global position
    pub events: Vec<CommittedEvent>,

    /// Highest global position in `events`, or 1 when the page is empty
    pub next_position: u64,
}

impl GlobalPage {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Consume the page, returning events ordered by global position
    pub fn into_sorted(mut self) -> Vec<CommittedEvent> {
        self.events.sort_by_key(|e| e.global_sequence_number);
        self.events
    }
}

/// Change notices broadcast to subscribers after a mutation completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogNotification {
    /// A batch was committed to one stream
    Committed {
        aggregate_id: String,
        batch_id: BatchId,
        first_position: u64,
        last_position: u64,
        count: usize,
    },

    /// A whole stream was removed
    StreamDeleted { aggregate_id: String, removed: usize },
}

/// Event log errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventLogError {
    #[error(
        "Concurrency conflict on aggregate {aggregate_id}: expected sequence {expected}, got {actual}"
    )]
    ConcurrencyConflict {
        aggregate_id: String,
        /// Next free sequence number in the stream (current length + 1)
        expected: u64,
        /// First sequence number claimed by the rejected batch
        actual: u64,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

impl EventLogError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, EventLogError::ConcurrencyConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, EventLogError>;
