//! Wire-level frames pushed to change-feed subscribers.
//!
//! Records reuse the HTTP DTOs so a row looks the same whether it was fetched
//! or pushed.

use serde::Serialize;

use crate::domain::{ChangeEvent, ChangeOperation, EntityKind, Record};
use crate::inbound::http::dto::{BookDto, TransactionDto, UserDto};

/// Row carried by a change frame.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RecordDto {
    /// Catalogue entry.
    Book(BookDto),
    /// Staff account.
    User(UserDto),
    /// Loan.
    Transaction(TransactionDto),
}

impl From<&Record> for RecordDto {
    fn from(record: &Record) -> Self {
        match record {
            Record::Book(book) => Self::Book(book.into()),
            Record::User(user) => Self::User(user.into()),
            Record::Transaction(transaction) => Self::Transaction(transaction.into()),
        }
    }
}

/// Frame sent to subscribers.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FeedMessage {
    /// One applied change. Deletes carry the last known row.
    #[serde(rename_all = "camelCase")]
    Change {
        operation: ChangeOperation,
        entity: EntityKind,
        id: String,
        record: RecordDto,
    },
    /// The subscriber fell behind and missed `missed` changes; cached views
    /// should be refetched.
    Resync { missed: u64 },
}

impl From<&ChangeEvent> for FeedMessage {
    fn from(event: &ChangeEvent) -> Self {
        Self::Change {
            operation: event.operation,
            entity: event.kind(),
            id: event.record.id(),
            record: (&event.record).into(),
        }
    }
}
