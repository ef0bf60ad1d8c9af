//! Apply loop for changes arriving from the row-store feed.
//!
//! Exactly one task drains the channel, so external changes are applied in
//! the order the feed delivered them.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::{ChangeEvent, LibraryService};

/// Drain `events` into `library` until every sender is dropped.
///
/// Returns the number of events that changed the library. A failure to apply
/// one event is logged and does not stop the loop.
pub async fn run_apply_loop(
    library: Arc<LibraryService>,
    mut events: mpsc::Receiver<ChangeEvent>,
) -> usize {
    let mut applied = 0_usize;
    while let Some(event) = events.recv().await {
        let entity = event.kind();
        let id = event.record.id();
        match library.apply_external(event) {
            Ok(outcome) if outcome.changed() => {
                applied = applied.saturating_add(1);
                debug!(%entity, %id, ?outcome, "external change applied");
            }
            Ok(_) => {}
            Err(err) => error!(%entity, %id, error = %err, "failed to apply external change"),
        }
    }
    info!(applied, "change feed closed; apply loop stopped");
    applied
}
