//! Projection trait and in-order page application

use crate::error::Result;
use strand_eventlog::CommittedEvent;
use tracing::{debug, warn};

/// Read model built from the global event order.
///
/// `apply` is called once per event in ascending global position. An error
/// stops the page; the same event is offered again on the next poll.
pub trait Projection: Send {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Fold one event into the read model
    fn apply(&mut self, event: &CommittedEvent) -> Result<()>;
}

impl<P: Projection + ?Sized> Projection for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn apply(&mut self, event: &CommittedEvent) -> Result<()> {
        (**self).apply(event)
    }
}

/// Apply events to a projection in global order, skipping anything at or
/// below `cursor`.
///
/// `cursor` is advanced past every event that applied cleanly and is left
/// on the last good position if one fails. Returns how many were applied.
pub fn apply_events<P: Projection + ?Sized>(
    projection: &mut P,
    mut events: Vec<CommittedEvent>,
    cursor: &mut u64,
) -> Result<usize> {
    events.sort_by_key(|e| e.global_sequence_number);

    let mut applied = 0;
    for event in &events {
        if event.global_sequence_number <= *cursor {
            debug!(
                projection = projection.name(),
                position = event.global_sequence_number,
                "Event already applied"
            );
            continue;
        }

        if let Err(e) = projection.apply(event) {
            warn!(
                projection = projection.name(),
                position = event.global_sequence_number,
                aggregate_id = %event.aggregate_id,
                error = %e,
                "Failed to apply event (will retry)"
            );
            return Err(e);
        }

        *cursor = event.global_sequence_number;
        applied += 1;
    }

    Ok(applied)
}
