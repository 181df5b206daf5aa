//! Strand Event Log
//!
//! In-process, append-only event log keyed by aggregate identity:
//! - Optimistic concurrency control via per-aggregate sequence numbers
//! - One global, strictly increasing position across all aggregates
//! - Atomic multi-event batches
//! - Cancellable waits on the log-wide exclusive section
//!
//! Payload and metadata are opaque strings produced by the caller's
//! serializer; the log never looks inside them.
//!
//! # Usage
//!
//! ```rust
//! use strand_eventlog::{EventLog, SerializedEvent};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), strand_eventlog::EventLogError> {
//! let log = EventLog::new();
//! let cancel = CancellationToken::new();
//!
//! let batch = vec![
//!     SerializedEvent::new(1, r#"{"type":"OrderPlaced"}"#),
//!     SerializedEvent::new(2, r#"{"type":"OrderPaid"}"#),
//! ];
//! let committed = log.append("order-42", "Order", batch, &cancel).await?;
//! assert_eq!(committed[1].global_sequence_number, 2);
//!
//! let stream = log.load_stream("order-42", &cancel).await?;
//! assert_eq!(stream.len(), 2);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

mod append;
mod log;
pub mod query;
pub mod store;
pub mod types;

pub use log::{EventLog, NotificationReceiver, DEFAULT_NOTIFY_CAPACITY, MAX_NOTIFY_CAPACITY};
pub use query::EMPTY_PAGE_POSITION;
pub use store::EventStore;
pub use types::{
    BatchId, CommittedEvent, EventLogError, GlobalPage, LogNotification, Result, SerializedEvent,
};
