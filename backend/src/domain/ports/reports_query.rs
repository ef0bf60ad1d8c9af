//! Driving port for dashboard and report aggregates.

use async_trait::async_trait;

use crate::domain::query::{Dashboard, Reports};
use crate::domain::{Actor, Error};

/// Domain use-case port for read-only aggregates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportsQuery: Send + Sync {
    /// Counters and overdue loans as of now.
    async fn dashboard(&self, actor: &Actor) -> Result<Dashboard, Error>;

    /// Report series over the whole ledger.
    async fn reports(&self, actor: &Actor) -> Result<Reports, Error>;
}
