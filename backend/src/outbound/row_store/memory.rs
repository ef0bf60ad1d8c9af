//! In-process row store with a broadcast change feed per table.
//!
//! Stands in for the hosted row store: rows are kept as JSON objects keyed by
//! their `id` column, and every successful write is published on the
//! table's feed while the table lock is held, so subscribers see writes in
//! commit order.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::ports::{Row, RowEvent, RowFilter, RowStore, RowStoreError};
use crate::domain::{ChangeOperation, EntityKind};

/// Buffered notifications per table before slow subscribers lag.
pub const ROW_FEED_CAPACITY: usize = 1024;

type Table = BTreeMap<String, Row>;

/// Row store held in memory.
pub struct InMemoryRowStore {
    tables: Mutex<HashMap<EntityKind, Table>>,
    feeds: HashMap<EntityKind, broadcast::Sender<RowEvent>>,
}

impl Default for InMemoryRowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRowStore {
    /// Empty store with one table per [`EntityKind`].
    #[must_use]
    pub fn new() -> Self {
        let feeds = EntityKind::ALL
            .into_iter()
            .map(|kind| (kind, broadcast::channel(ROW_FEED_CAPACITY).0))
            .collect();
        Self {
            tables: Mutex::new(HashMap::new()),
            feeds,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<EntityKind, Table>>, RowStoreError> {
        self.tables
            .lock()
            .map_err(|_| RowStoreError::connection("row store lock poisoned"))
    }

    fn notify(&self, table: EntityKind, operation: ChangeOperation, row: Row) {
        if let Some(feed) = self.feeds.get(&table) {
            // No subscribers yet is fine.
            feed.send(RowEvent {
                table,
                operation,
                row,
            })
            .ok();
        }
    }
}

fn row_id(table: EntityKind, row: &Row) -> Result<String, RowStoreError> {
    match row.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.clone()),
        _ => Err(RowStoreError::rejected(format!(
            "{} row is missing a string id",
            table.table()
        ))),
    }
}

#[async_trait]
impl RowStore for InMemoryRowStore {
    async fn select(&self, table: EntityKind, filter: &RowFilter) -> Result<Vec<Row>, RowStoreError> {
        let tables = self.lock()?;
        Ok(tables
            .get(&table)
            .map(|rows| rows.values().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, table: EntityKind, row: Row) -> Result<Row, RowStoreError> {
        let id = row_id(table, &row)?;
        let mut tables = self.lock()?;
        let rows = tables.entry(table).or_default();
        if rows.contains_key(&id) {
            return Err(RowStoreError::rejected(format!(
                "duplicate key {id} in {}",
                table.table()
            )));
        }
        rows.insert(id.clone(), row.clone());
        debug!(table = table.table(), %id, "row inserted");
        self.notify(table, ChangeOperation::Insert, row.clone());
        Ok(row)
    }

    async fn update(&self, table: EntityKind, id: &str, patch: Row) -> Result<Row, RowStoreError> {
        let mut tables = self.lock()?;
        let stored = tables
            .get_mut(&table)
            .and_then(|rows| rows.get_mut(id))
            .ok_or_else(|| RowStoreError::missing_row(table.table(), id))?;
        for (column, value) in patch {
            if column != "id" {
                stored.insert(column, value);
            }
        }
        let updated = stored.clone();
        debug!(table = table.table(), %id, "row updated");
        self.notify(table, ChangeOperation::Update, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, table: EntityKind, id: &str) -> Result<(), RowStoreError> {
        let mut tables = self.lock()?;
        let removed = tables
            .get_mut(&table)
            .and_then(|rows| rows.remove(id))
            .ok_or_else(|| RowStoreError::missing_row(table.table(), id))?;
        debug!(table = table.table(), %id, "row deleted");
        self.notify(table, ChangeOperation::Delete, removed);
        Ok(())
    }

    fn subscribe(&self, table: EntityKind) -> broadcast::Receiver<RowEvent> {
        match self.feeds.get(&table) {
            Some(feed) => feed.subscribe(),
            // Every kind gets a feed in `new`; an unknown table yields a
            // closed receiver.
            None => broadcast::channel(1).1,
        }
    }
}
