//! Projection worker: scans the global order and feeds a projection.
//!
//! The worker owns its cursor (last applied global position). It never
//! adopts `next_position` from an empty page, because an empty page reports
//! position 1 regardless of where the scan stood.

use crate::apply::{apply_events, Projection};
use crate::error::Result;
use std::sync::Arc;
use strand_eventlog::EventLog;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Projection worker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionConfig {
    /// Width of each global range request
    pub page_size: u64,
    /// Fallback poll interval when no commit notices arrive
    pub poll_interval_ms: u64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            page_size: 1000,
            poll_interval_ms: 100,
        }
    }
}

/// Projection worker.
pub struct ProjectionWorker<P> {
    log: Arc<EventLog>,
    projection: P,
    config: ProjectionConfig,
    cursor: u64,
}

impl<P: Projection> ProjectionWorker<P> {
    /// Create a worker that starts from the beginning of the log.
    pub fn new(log: Arc<EventLog>, projection: P, config: ProjectionConfig) -> Self {
        Self {
            log,
            projection,
            config,
            cursor: 0,
        }
    }

    /// Resume after a previously saved cursor.
    pub fn starting_after(mut self, cursor: u64) -> Self {
        self.cursor = cursor;
        self
    }

    /// Last global position consumed (applied or known to be deleted)
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn projection(&self) -> &P {
        &self.projection
    }

    pub fn into_projection(self) -> P {
        self.projection
    }

    /// Fetch and apply one page after the cursor.
    ///
    /// Returns the number of events applied.
    pub async fn poll_once(&mut self, cancel: &CancellationToken) -> Result<usize> {
        // Read the tail first: anything at or below it that the page lacks
        // has been deleted, since positions are never reused.
        let tail = self.log.last_global_position(cancel).await?;
        if tail <= self.cursor {
            return Ok(0);
        }

        let start = self.cursor + 1;
        let end = self.cursor.saturating_add(self.config.page_size.max(1));
        let page = self.log.load_global_range(start, end, cancel).await?;

        let applied = apply_events(&mut self.projection, page.events, &mut self.cursor)?;

        // Skip over positions freed by deleted streams
        let settled = end.min(tail);
        if settled > self.cursor {
            debug!(
                projection = self.projection.name(),
                from = self.cursor,
                to = settled,
                "Skipping deleted positions"
            );
            self.cursor = settled;
        }

        Ok(applied)
    }

    /// Apply everything up to the current tail of the log.
    pub async fn catch_up(&mut self, cancel: &CancellationToken) -> Result<usize> {
        let mut total = 0;
        while self.cursor < self.log.last_global_position(cancel).await? {
            total += self.poll_once(cancel).await?;
        }
        Ok(total)
    }

    /// Run the worker loop.
    ///
    /// Wakes on commit notices or the poll interval. Returns the worker
    /// (cursor and projection intact) when `shutdown` is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) -> Self {
        info!(
            projection = self.projection.name(),
            cursor = self.cursor,
            page_size = self.config.page_size,
            poll_interval_ms = self.config.poll_interval_ms,
            "Projection worker started"
        );

        let mut notices = self.log.subscribe();
        let mut notices_open = true;

        let mut ticker = interval(Duration::from_millis(self.config.poll_interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(projection = self.projection.name(), "Projection worker shutdown requested");
                    break;
                }
                notice = notices.recv(), if notices_open => {
                    match notice {
                        Some(Ok(_)) => {}
                        Some(Err(missed)) => {
                            warn!(
                                projection = self.projection.name(),
                                missed,
                                "Projection worker lagged behind commit notices"
                            );
                        }
                        None => notices_open = false,
                    }
                }
                _ = ticker.tick() => {}
            }

            match self.catch_up(&shutdown).await {
                Ok(count) if count > 0 => {
                    debug!(projection = self.projection.name(), count, cursor = self.cursor, "Applied events");
                }
                Ok(_) => {}
                Err(e) if e.is_cancelled() => break,
                Err(e) => {
                    error!(projection = self.projection.name(), error = %e, "Projection error (will retry)");
                }
            }
        }

        info!(projection = self.projection.name(), cursor = self.cursor, "Projection worker stopped");
        self
    }
}
