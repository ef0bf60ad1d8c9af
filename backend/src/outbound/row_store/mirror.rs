//! Outbox drain: mirrors committed library changes into the row store.
//!
//! A single task consumes the outbox so rows are written in commit order.
//! Failures are logged and skipped; the in-process library stays the source
//! of truth for this process.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::domain::{ChangeEvent, ChangeOperation};
use crate::domain::ports::{RowStore, RowStoreError};

use super::codec::{self, RowCodecError};

/// Failure to mirror one change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirrorError {
    /// Record could not be encoded.
    #[error(transparent)]
    Codec(#[from] RowCodecError),
    /// Store refused or failed the write.
    #[error(transparent)]
    Store(#[from] RowStoreError),
}

/// Writes library changes to a [`RowStore`].
#[derive(Clone)]
pub struct RowStoreMirror {
    store: Arc<dyn RowStore>,
}

impl RowStoreMirror {
    /// Mirror into `store`.
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    /// Write one change.
    ///
    /// Updates of rows the store does not hold fall back to an insert, and
    /// deletes of rows it never saw are treated as done.
    pub async fn write(&self, event: &ChangeEvent) -> Result<(), MirrorError> {
        let table = event.kind();
        let id = event.record.id();
        match event.operation {
            ChangeOperation::Insert => {
                self.store.insert(table, codec::encode(&event.record)?).await?;
            }
            ChangeOperation::Update => {
                let row = codec::encode(&event.record)?;
                match self.store.update(table, &id, row.clone()).await {
                    Ok(_) => {}
                    Err(RowStoreError::MissingRow { .. }) => {
                        self.store.insert(table, row).await?;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            ChangeOperation::Delete => match self.store.delete(table, &id).await {
                Ok(()) | Err(RowStoreError::MissingRow { .. }) => {}
                Err(err) => return Err(err.into()),
            },
        }
        Ok(())
    }

    /// Drain `outbox` until the library drops its sender.
    ///
    /// Returns the number of changes written.
    pub async fn run(self, mut outbox: mpsc::UnboundedReceiver<ChangeEvent>) -> usize {
        let mut written = 0_usize;
        while let Some(event) = outbox.recv().await {
            match self.write(&event).await {
                Ok(()) => written = written.saturating_add(1),
                Err(err) => warn!(
                    entity = %event.kind(),
                    id = %event.record.id(),
                    error = %err,
                    "failed to mirror change to the row store"
                ),
            }
        }
        info!(written, "outbox closed; mirror stopped");
        written
    }
}
