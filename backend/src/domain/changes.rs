//! Change events exchanged with the row store and the live feed.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Book, Transaction, User};

/// Record families kept by the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Catalogue entries.
    Book,
    /// Directory accounts.
    User,
    /// Loans.
    Transaction,
}

impl EntityKind {
    /// Every kind, in dependency order (leaves first).
    pub const ALL: [Self; 3] = [Self::Book, Self::User, Self::Transaction];

    /// Singular name used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::User => "user",
            Self::Transaction => "transaction",
        }
    }

    /// Row-store table holding this kind.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Book => "books",
            Self::User => "users",
            Self::Transaction => "transactions",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of mutation carried by a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    /// New row.
    Insert,
    /// Replaced row.
    Update,
    /// Removed row.
    Delete,
}

/// Full record payload of a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Book row.
    Book(Book),
    /// User row.
    User(User),
    /// Transaction row.
    Transaction(Transaction),
}

impl Record {
    /// Family of the record.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Book(_) => EntityKind::Book,
            Self::User(_) => EntityKind::User,
            Self::Transaction(_) => EntityKind::Transaction,
        }
    }

    /// Identifier rendered as a string.
    #[must_use]
    pub fn id(&self) -> String {
        match self {
            Self::Book(book) => book.id.to_string(),
            Self::User(user) => user.id.to_string(),
            Self::Transaction(transaction) => transaction.id.to_string(),
        }
    }

    /// Mutation counter of the record.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        match self {
            Self::Book(book) => book.revision,
            Self::User(user) => user.revision,
            Self::Transaction(transaction) => transaction.revision,
        }
    }
}

/// Ordered unit of change, produced by local commits and by the row-store
/// feed alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// What happened.
    pub operation: ChangeOperation,
    /// Row after the change; for deletes, the last known row.
    pub record: Record,
}

impl ChangeEvent {
    /// Insert of `record`.
    #[must_use]
    pub const fn insert(record: Record) -> Self {
        Self {
            operation: ChangeOperation::Insert,
            record,
        }
    }

    /// Update of `record`.
    #[must_use]
    pub const fn update(record: Record) -> Self {
        Self {
            operation: ChangeOperation::Update,
            record,
        }
    }

    /// Deletion of `record`.
    #[must_use]
    pub const fn delete(record: Record) -> Self {
        Self {
            operation: ChangeOperation::Delete,
            record,
        }
    }

    /// Family of the changed record.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.record.kind()
    }
}
