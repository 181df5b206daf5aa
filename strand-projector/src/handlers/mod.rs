//! Built-in projections

mod catalog;

pub use catalog::{StreamCatalog, StreamSummary};
