//! Projection errors

use strand_eventlog::{CommittedEvent, EventLogError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Event log error: {0}")]
    Store(#[from] EventLogError),

    #[error("Projection {projection} failed at position {global_sequence_number}: {reason}")]
    Apply {
        projection: String,
        global_sequence_number: u64,
        reason: String,
    },

    #[error("Invalid payload at position {global_sequence_number}: {reason}")]
    InvalidPayload {
        global_sequence_number: u64,
        reason: String,
    },
}

impl ProjectionError {
    /// Rejection of a well-formed event by a projection's own rules
    pub fn apply(projection: &str, event: &CommittedEvent, reason: impl Into<String>) -> Self {
        Self::Apply {
            projection: projection.to_string(),
            global_sequence_number: event.global_sequence_number,
            reason: reason.into(),
        }
    }

    /// Payload that could not be decoded
    pub fn invalid_payload(event: &CommittedEvent, err: serde_json::Error) -> Self {
        Self::InvalidPayload {
            global_sequence_number: event.global_sequence_number,
            reason: err.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProjectionError::Store(EventLogError::Cancelled))
    }
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
