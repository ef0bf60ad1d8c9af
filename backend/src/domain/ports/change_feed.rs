//! Driving port for observing committed changes.

use tokio::sync::broadcast;

use crate::domain::ChangeEvent;

/// Source of change events applied to the library, in commit order.
///
/// Slow receivers lag and miss events rather than blocking writers.
#[cfg_attr(test, mockall::automock)]
pub trait ChangeFeed: Send + Sync {
    /// Start receiving events committed from now on.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}
