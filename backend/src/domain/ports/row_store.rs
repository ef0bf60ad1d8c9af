//! Driven port for the hosted row store that persists library records.
//!
//! Rows are opaque JSON objects keyed by column name. The store answers
//! request/response calls and publishes an ordered change feed per table;
//! the library never blocks on it while holding its own lock.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::domain::{ChangeOperation, EntityKind};

use super::define_port_error;

/// One stored row.
pub type Row = Map<String, Value>;

define_port_error! {
    /// Errors raised by row-store adapters.
    pub enum RowStoreError {
        /// The store could not be reached.
        Connection { message: String } => "row store connection failed: {message}",
        /// The store refused the row or patch.
        Rejected { message: String } => "row store rejected the request: {message}",
        /// The addressed row does not exist.
        MissingRow { table: String, id: String } => "{table} row {id} not found",
    }
}

/// Column equality filter for [`RowStore::select`].
///
/// # Examples
/// ```
/// use library_backend::domain::ports::RowFilter;
/// use serde_json::json;
///
/// let filter = RowFilter::all().where_eq("status", json!("borrowed"));
/// let row = json!({ "status": "borrowed" });
/// assert!(filter.matches(row.as_object().expect("object")));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFilter {
    equals: Vec<(String, Value)>,
}

impl RowFilter {
    /// Match every row.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Additionally require `column == value`.
    #[must_use]
    pub fn where_eq(mut self, column: impl Into<String>, value: Value) -> Self {
        self.equals.push((column.into(), value));
        self
    }

    /// Whether `row` satisfies every condition.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        self.equals
            .iter()
            .all(|(column, value)| row.get(column) == Some(value))
    }
}

/// Change notification published by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RowEvent {
    /// Table the row lives in.
    pub table: EntityKind,
    /// What happened.
    pub operation: ChangeOperation,
    /// Row after the change; for deletes, the removed row.
    pub row: Row,
}

/// Port for reading, writing and watching stored rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Rows of `table` matching `filter`.
    async fn select(&self, table: EntityKind, filter: &RowFilter) -> Result<Vec<Row>, RowStoreError>;

    /// Insert a new row and return it as stored.
    async fn insert(&self, table: EntityKind, row: Row) -> Result<Row, RowStoreError>;

    /// Merge `patch` into the row with primary key `id`.
    async fn update(&self, table: EntityKind, id: &str, patch: Row) -> Result<Row, RowStoreError>;

    /// Remove the row with primary key `id`.
    async fn delete(&self, table: EntityKind, id: &str) -> Result<(), RowStoreError>;

    /// Ordered change feed of `table`.
    fn subscribe(&self, table: EntityKind) -> broadcast::Receiver<RowEvent>;
}
