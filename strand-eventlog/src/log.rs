//! Event Log State and Exclusive Section
//!
//! All streams live in one `LogState` behind a single log-wide mutex.
//! Global sequence numbers are assigned from a counter that reflects every
//! aggregate at once, so a per-aggregate lock would let two appends to
//! different aggregates hand out the same position.

use crate::types::{CommittedEvent, EventLogError, LogNotification, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default number of buffered notifications per subscriber
pub const DEFAULT_NOTIFY_CAPACITY: usize = 1024;

/// Largest accepted notification buffer; larger requests are clamped
pub const MAX_NOTIFY_CAPACITY: usize = 65_536;

/// Append-only event log with a global total order.
///
/// Cheap to share behind an `Arc`; every operation takes `&self`.
pub struct EventLog {
    state: Mutex<LogState>,
    notifier: broadcast::Sender<LogNotification>,
}

/// Everything guarded by the exclusive section.
#[derive(Default)]
pub(crate) struct LogState {
    /// Stream per aggregate id, index `i` holds aggregate sequence `i + 1`
    pub(crate) streams: HashMap<String, Vec<Arc<CommittedEvent>>>,

    /// Global position index over all live streams
    pub(crate) by_position: BTreeMap<u64, Arc<CommittedEvent>>,

    /// Highest global position ever assigned. Never decremented.
    pub(crate) last_global_position: u64,
}

impl LogState {
    pub(crate) fn stream_len(&self, aggregate_id: &str) -> u64 {
        self.streams.get(aggregate_id).map_or(0, |s| s.len() as u64)
    }
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::with_notify_capacity(DEFAULT_NOTIFY_CAPACITY)
    }

    /// Create an empty log whose subscribers buffer up to `capacity` notices
    /// before they start lagging.
    ///
    /// `capacity` is clamped to `1..=MAX_NOTIFY_CAPACITY`.
    pub fn with_notify_capacity(capacity: usize) -> Self {
        let (notifier, _) = broadcast::channel(capacity.clamp(1, MAX_NOTIFY_CAPACITY));
        Self {
            state: Mutex::new(LogState::default()),
            notifier,
        }
    }

    /// Enter the exclusive section.
    ///
    /// The wait is abandoned as soon as `cancel` fires. An already cancelled
    /// token wins over a free lock, so a cancelled call never mutates.
    pub(crate) async fn lock(&self, cancel: &CancellationToken) -> Result<MutexGuard<'_, LogState>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Event log lock wait cancelled");
                Err(EventLogError::Cancelled)
            }
            guard = self.state.lock() => Ok(guard),
        }
    }

    /// Best-effort broadcast; having no subscribers is not an error.
    pub(crate) fn notify(&self, notification: LogNotification) {
        let _ = self.notifier.send(notification);
    }

    /// Subscribe to commit and deletion notices.
    ///
    /// Only notices sent after subscription are received.
    pub fn subscribe(&self) -> NotificationReceiver {
        NotificationReceiver {
            receiver: self.notifier.subscribe(),
        }
    }

    /// Remove an aggregate's whole stream.
    ///
    /// Returns how many events were removed (0 if the stream did not exist).
    /// Global positions of removed events are never handed out again.
    pub async fn delete_stream(&self, aggregate_id: &str, cancel: &CancellationToken) -> Result<usize> {
        let mut state = self.lock(cancel).await?;

        let Some(stream) = state.streams.remove(aggregate_id) else {
            debug!(aggregate_id = %aggregate_id, "Delete of missing stream ignored");
            return Ok(0);
        };

        for event in &stream {
            state.by_position.remove(&event.global_sequence_number);
        }

        let removed = stream.len();
        info!(aggregate_id = %aggregate_id, removed, "Stream deleted");

        self.notify(LogNotification::StreamDeleted {
            aggregate_id: aggregate_id.to_string(),
            removed,
        });

        Ok(removed)
    }

    /// Current length of an aggregate's stream (0 if it has no events).
    ///
    /// The next batch for this aggregate must start at `stream_version + 1`.
    pub async fn stream_version(&self, aggregate_id: &str, cancel: &CancellationToken) -> Result<u64> {
        let state = self.lock(cancel).await?;
        Ok(state.stream_len(aggregate_id))
    }

    /// Highest global position ever assigned, including deleted events
    pub async fn last_global_position(&self, cancel: &CancellationToken) -> Result<u64> {
        let state = self.lock(cancel).await?;
        Ok(state.last_global_position)
    }

    /// Number of live events across all streams
    pub async fn event_count(&self, cancel: &CancellationToken) -> Result<usize> {
        let state = self.lock(cancel).await?;
        Ok(state.by_position.len())
    }

    /// Number of live streams
    pub async fn stream_count(&self, cancel: &CancellationToken) -> Result<usize> {
        let state = self.lock(cancel).await?;
        Ok(state.streams.len())
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver for log notifications.
pub struct NotificationReceiver {
    receiver: broadcast::Receiver<LogNotification>,
}

impl NotificationReceiver {
    /// Receive the next notice.
    ///
    /// Returns `None` once the log has been dropped.
    /// Returns `Err(missed)` if this receiver fell behind and lost notices.
    pub async fn recv(&mut self) -> Option<std::result::Result<LogNotification, u64>> {
        match self.receiver.recv().await {
            Ok(notice) => Some(Ok(notice)),
            Err(broadcast::error::RecvError::Closed) => None,
            Err(broadcast::error::RecvError::Lagged(missed)) => Some(Err(missed)),
        }
    }

    /// Receive a notice without waiting.
    pub fn try_recv(&mut self) -> Option<std::result::Result<LogNotification, u64>> {
        match self.receiver.try_recv() {
            Ok(notice) => Some(Ok(notice)),
            Err(broadcast::error::TryRecvError::Empty) => None,
            Err(broadcast::error::TryRecvError::Closed) => None,
            Err(broadcast::error::TryRecvError::Lagged(missed)) => Some(Err(missed)),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
