//! Simulator error types.

use strand_eventlog::EventLogError;
use strand_projector::ProjectionError;
use thiserror::Error;

/// Simulator-level errors.
#[derive(Debug, Error)]
pub enum SimError {
    /// Event log error
    #[error("Event log error: {0}")]
    EventLog(#[from] EventLogError),

    /// Projection error
    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    /// Conflicts persisted past the retry budget
    #[error("Gave up on aggregate {aggregate_id} after {attempts} conflicting attempts")]
    RetriesExhausted { aggregate_id: String, attempts: u32 },

    /// Writer or worker task panicked or was aborted
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for simulator operations.
pub type SimResult<T> = Result<T, SimError>;
