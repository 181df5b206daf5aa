//! Simulation runner: concurrent writers plus a live projection on one log.

use crate::config::Config;
use crate::error::SimResult;
use crate::workload::run_writer;
use std::collections::HashSet;
use std::sync::Arc;
use strand_eventlog::EventLog;
use strand_projector::{ProjectionWorker, StreamCatalog};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Outcome of a simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimReport {
    pub events_appended: u64,
    pub conflicts: u64,
    pub streams: usize,
    pub last_global_position: u64,
    pub projected_events: u64,
    /// Every stream is gap-free and the global scan has no duplicates
    pub consistent: bool,
}

/// Run the configured workload to completion on a fresh log.
///
/// `cancel` aborts writers and the projection early.
pub async fn run(config: &Config, cancel: CancellationToken) -> SimResult<SimReport> {
    let log = Arc::new(EventLog::with_notify_capacity(config.notify_capacity));
    run_with_log(log, config, cancel).await
}

/// Run the configured workload against an existing log.
///
/// Every task spawned here has been joined by the time this returns,
/// whether the run succeeded or not.
pub async fn run_with_log(
    log: Arc<EventLog>,
    config: &Config,
    cancel: CancellationToken,
) -> SimResult<SimReport> {
    // Projection runs alongside the writers
    let projection_shutdown = cancel.child_token();
    let writer_cancel = cancel.child_token();
    let _stop_projection = projection_shutdown.clone().drop_guard();
    let _stop_writers = writer_cancel.clone().drop_guard();

    let worker = ProjectionWorker::new(Arc::clone(&log), StreamCatalog::new(), config.projection.clone());
    let projection = tokio::spawn(worker.run(projection_shutdown.clone()));

    info!(
        writers = config.workload.writers,
        batches_per_writer = config.workload.batches_per_writer,
        batch_size = config.workload.batch_size,
        shared_aggregates = config.workload.shared_aggregates,
        "Starting writers"
    );

    let writers: Vec<_> = (0..config.workload.writers)
        .map(|writer| {
            tokio::spawn(run_writer(
                Arc::clone(&log),
                config.workload.clone(),
                writer,
                writer_cancel.clone(),
            ))
        })
        .collect();

    // Join every writer; the first failure stops the rest
    let mut outcome: SimResult<(u64, u64)> = Ok((0, 0));
    for handle in writers {
        match handle.await {
            Ok(Ok(report)) => {
                if let Ok((events, conflicts)) = &mut outcome {
                    *events += report.events_appended;
                    *conflicts += report.conflicts;
                }
            }
            Ok(Err(e)) if outcome.is_ok() => {
                warn!(error = %e, "Writer failed, stopping remaining writers");
                writer_cancel.cancel();
                outcome = Err(e);
            }
            Err(e) if outcome.is_ok() => {
                writer_cancel.cancel();
                outcome = Err(e.into());
            }
            _ => {}
        }
    }

    // Writers are done; stop the live worker and drain whatever is left
    projection_shutdown.cancel();
    let mut worker = projection.await?;
    let (events_appended, conflicts) = outcome?;
    worker.catch_up(&cancel).await?;

    let catalog = worker.into_projection();
    let consistent = verify(&log, &cancel).await?;
    let report = SimReport {
        events_appended,
        conflicts,
        streams: log.stream_count(&cancel).await?,
        last_global_position: log.last_global_position(&cancel).await?,
        projected_events: catalog.total_events(),
        consistent,
    };

    info!(
        events = report.events_appended,
        conflicts = report.conflicts,
        streams = report.streams,
        last_global_position = report.last_global_position,
        projected = report.projected_events,
        consistent = report.consistent,
        "Simulation finished"
    );

    Ok(report)
}

/// Check stream contiguity and global uniqueness over the whole log.
async fn verify(log: &EventLog, cancel: &CancellationToken) -> SimResult<bool> {
    let tail = log.last_global_position(cancel).await?;
    let page = log.load_global_range(1, tail, cancel).await?;

    let mut positions = HashSet::new();
    let mut aggregates = HashSet::new();
    for event in &page.events {
        if !positions.insert(event.global_sequence_number) {
            warn!(position = event.global_sequence_number, "Duplicate global position");
            return Ok(false);
        }
        aggregates.insert(event.aggregate_id.clone());
    }

    for aggregate_id in &aggregates {
        let stream = log.load_stream(aggregate_id, cancel).await?;
        let gap_free = stream
            .iter()
            .enumerate()
            .all(|(i, e)| e.aggregate_sequence_number == i as u64 + 1);
        let ordered = stream
            .windows(2)
            .all(|w| w[0].global_sequence_number < w[1].global_sequence_number);

        if !gap_free || !ordered {
            warn!(aggregate_id = %aggregate_id, "Stream failed verification");
            return Ok(false);
        }
    }

    Ok(true)
}
