//! Row-store change feed: decodes table notifications and hands them to the
//! library's apply loop, plus the startup hydration that precedes it.

use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use crate::domain::ports::{RowEvent, RowFilter, RowStore, RowStoreError};
use crate::domain::{ChangeEvent, EntityKind, Error, LibraryService};

use super::codec;

/// Subscriptions to every library table.
pub struct RowFeed {
    books: broadcast::Receiver<RowEvent>,
    users: broadcast::Receiver<RowEvent>,
    transactions: broadcast::Receiver<RowEvent>,
}

impl RowFeed {
    /// Subscribe to the books, users and transactions tables.
    pub fn subscribe(store: &dyn RowStore) -> Self {
        Self {
            books: store.subscribe(EntityKind::Book),
            users: store.subscribe(EntityKind::User),
            transactions: store.subscribe(EntityKind::Transaction),
        }
    }

    /// Forward decoded changes to `sink` until a table feed closes or the
    /// sink is dropped.
    ///
    /// Notifications are forwarded per table in the order the store
    /// published them. Undecodable rows are logged and skipped. Returns the
    /// number of events forwarded.
    pub async fn forward(mut self, sink: mpsc::Sender<ChangeEvent>) -> usize {
        let mut forwarded = 0_usize;
        loop {
            let received = tokio::select! {
                event = self.books.recv() => event,
                event = self.users.recv() => event,
                event = self.transactions.recv() => event,
            };
            let event = match received {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "row feed lagged; changes were missed until the next restart");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let table = event.table;
            match codec::decode_event(event) {
                Ok(change) => {
                    if sink.send(change).await.is_err() {
                        break;
                    }
                    forwarded = forwarded.saturating_add(1);
                }
                Err(err) => warn!(table = table.table(), error = %err, "skipping undecodable row"),
            }
        }
        info!(forwarded, "row feed stopped");
        forwarded
    }
}

/// Failure to load the initial rows.
#[derive(Debug, thiserror::Error)]
pub enum HydrateError {
    /// The store could not be read.
    #[error(transparent)]
    Store(#[from] RowStoreError),
    /// The library rejected the loaded state.
    #[error("library state unavailable: {0}")]
    Library(#[from] Error),
}

/// Load every row of every table into `library`.
///
/// Tables are read leaves first. Malformed rows are logged and skipped.
/// Returns the number of records applied.
pub async fn hydrate(store: &dyn RowStore, library: &LibraryService) -> Result<usize, HydrateError> {
    let mut applied = 0_usize;
    for table in EntityKind::ALL {
        let rows = store.select(table, &RowFilter::all()).await?;
        for row in rows {
            match codec::decode(table, row) {
                Ok(record) => {
                    if library.apply_external(ChangeEvent::insert(record))?.changed() {
                        applied = applied.saturating_add(1);
                    }
                }
                Err(err) => warn!(table = table.table(), error = %err, "skipping undecodable row"),
            }
        }
    }
    info!(applied, "library hydrated from the row store");
    Ok(applied)
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use std::sync::Arc;

    use super::*;
    use crate::domain::ports::MockRowStore;
    use crate::domain::{ChangeOperation, Record};
    use crate::outbound::row_store::InMemoryRowStore;
    use crate::test_support::{MutableClock, library_at};
    use chrono::Utc;
    use rstest::rstest;
    use serde_json::json;

    fn book_row(id: &str, title: &str) -> crate::domain::ports::Row {
        json!({
            "id": id,
            "title": title,
            "author": "Jane Austen",
            "category": "Novels",
            "total_copies": 15,
            "available_copies": 10,
            "created_at": "2023-05-01T09:00:00Z",
            "updated_at": "2023-05-01T09:00:00Z",
            "revision": 1
        })
        .as_object()
        .cloned()
        .expect("object literal")
    }

    #[rstest]
    #[tokio::test]
    async fn forwards_decoded_changes_and_skips_garbage() {
        let store = InMemoryRowStore::new();
        let feed = RowFeed::subscribe(&store);
        let (tx, mut rx) = mpsc::channel(8);
        let forwarder = tokio::spawn(feed.forward(tx));

        store
            .insert(EntityKind::Book, book_row("not-a-uuid", "Broken"))
            .await
            .expect("insert");
        store
            .insert(
                EntityKind::Book,
                book_row("3f2504e0-4f89-41d3-9a0c-0305e82c3301", "Pride and Prejudice"),
            )
            .await
            .expect("insert");

        let change = rx.recv().await.expect("forwarded");
        assert_eq!(change.operation, ChangeOperation::Insert);
        assert!(matches!(&change.record, Record::Book(book) if book.title == "Pride and Prejudice"));

        drop(rx);
        drop(store);
        assert_eq!(forwarder.await.expect("joined"), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn hydrate_loads_all_tables() {
        let store = InMemoryRowStore::new();
        store
            .insert(
                EntityKind::Book,
                book_row("3f2504e0-4f89-41d3-9a0c-0305e82c3301", "Pride and Prejudice"),
            )
            .await
            .expect("insert");
        store
            .insert(EntityKind::Book, book_row("garbage", "Broken"))
            .await
            .expect("insert");
        let library = library_at(Arc::new(MutableClock::new(Utc::now())));

        let applied = hydrate(&store, &library).await.expect("hydrated");
        assert_eq!(applied, 1);
        assert_eq!(library.snapshot().expect("snapshot").catalog.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn hydrate_propagates_store_failures() {
        let mut store = MockRowStore::new();
        store
            .expect_select()
            .returning(|_, _| Err(RowStoreError::connection("refused")));
        let library = library_at(Arc::new(MutableClock::new(Utc::now())));
        let err = hydrate(&store, &library).await.expect_err("store down");
        assert!(matches!(err, HydrateError::Store(_)));
    }
}
