//! Strand Projector
//!
//! Builds read models from the event log's global order. This is the
//! read side of Event Sourcing: a worker scans the log with global range
//! queries, keeps its own cursor, and folds each event into a `Projection`.

pub mod apply;
pub mod error;
pub mod handlers;
pub mod worker;

pub use apply::{apply_events, Projection};
pub use error::{ProjectionError, Result};
pub use handlers::{StreamCatalog, StreamSummary};
pub use worker::{ProjectionConfig, ProjectionWorker};
