//! Event store trait definition (Port)
//!
//! The aggregate-persistence layer depends on this trait rather than on
//! `EventLog` directly, so it can be exercised against a test double.

use crate::log::EventLog;
use crate::types::{CommittedEvent, GlobalPage, Result, SerializedEvent};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Append-only store of aggregate event streams
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append a batch that continues the aggregate's stream
    async fn append(
        &self,
        aggregate_id: &str,
        aggregate_name: &str,
        batch: Vec<SerializedEvent>,
        cancel: &CancellationToken,
    ) -> Result<Vec<CommittedEvent>>;

    /// Load all events of one aggregate (in order)
    async fn load_stream(
        &self,
        aggregate_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<CommittedEvent>>;

    /// Load events in an inclusive global position range
    async fn load_global_range(
        &self,
        start: u64,
        end: u64,
        cancel: &CancellationToken,
    ) -> Result<GlobalPage>;

    /// Delete an aggregate's stream, returning how many events were removed
    async fn delete_stream(&self, aggregate_id: &str, cancel: &CancellationToken) -> Result<usize>;

    /// Current length of an aggregate's stream
    async fn stream_version(&self, aggregate_id: &str, cancel: &CancellationToken) -> Result<u64> {
        Ok(self.load_stream(aggregate_id, cancel).await?.len() as u64)
    }
}

#[async_trait]
impl EventStore for EventLog {
    async fn append(
        &self,
        aggregate_id: &str,
        aggregate_name: &str,
        batch: Vec<SerializedEvent>,
        cancel: &CancellationToken,
    ) -> Result<Vec<CommittedEvent>> {
        EventLog::append(self, aggregate_id, aggregate_name, batch, cancel).await
    }

    async fn load_stream(
        &self,
        aggregate_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<CommittedEvent>> {
        EventLog::load_stream(self, aggregate_id, cancel).await
    }

    async fn load_global_range(
        &self,
        start: u64,
        end: u64,
        cancel: &CancellationToken,
    ) -> Result<GlobalPage> {
        EventLog::load_global_range(self, start, end, cancel).await
    }

    async fn delete_stream(&self, aggregate_id: &str, cancel: &CancellationToken) -> Result<usize> {
        EventLog::delete_stream(self, aggregate_id, cancel).await
    }

    async fn stream_version(&self, aggregate_id: &str, cancel: &CancellationToken) -> Result<u64> {
        EventLog::stream_version(self, aggregate_id, cancel).await
    }
}

#[async_trait]
impl<S: EventStore + ?Sized> EventStore for Arc<S> {
    async fn append(
        &self,
        aggregate_id: &str,
        aggregate_name: &str,
        batch: Vec<SerializedEvent>,
        cancel: &CancellationToken,
    ) -> Result<Vec<CommittedEvent>> {
        (**self).append(aggregate_id, aggregate_name, batch, cancel).await
    }

    async fn load_stream(
        &self,
        aggregate_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<CommittedEvent>> {
        (**self).load_stream(aggregate_id, cancel).await
    }

    async fn load_global_range(
        &self,
        start: u64,
        end: u64,
        cancel: &CancellationToken,
    ) -> Result<GlobalPage> {
        (**self).load_global_range(start, end, cancel).await
    }

    async fn delete_stream(&self, aggregate_id: &str, cancel: &CancellationToken) -> Result<usize> {
        (**self).delete_stream(aggregate_id, cancel).await
    }

    async fn stream_version(&self, aggregate_id: &str, cancel: &CancellationToken) -> Result<u64> {
        (**self).stream_version(aggregate_id, cancel).await
    }
}
