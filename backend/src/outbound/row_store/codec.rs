//! Translation between domain records and row-store rows.
//!
//! Rows carry snake_case column names. Row structs are internal; decoding
//! re-checks the invariants the domain types rely on, so a malformed row
//! surfaces as a typed error instead of corrupting the library.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::ports::{Row, RowEvent};
use crate::domain::{
    Book, BookCategory, BookId, ChangeEvent, ChangeOperation, Copies, DisplayName, EmailAddress,
    EntityKind, Money, Record, Role, Transaction, TransactionId, TransactionStatus, User, UserId,
};

/// Failure to translate a row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowCodecError {
    /// Row could not be read as the table's record type.
    #[error("malformed {table} row: {message}")]
    Malformed {
        /// Table the row came from.
        table: &'static str,
        /// Decoder message.
        message: String,
    },
    /// Record did not serialise to a JSON object.
    #[error("{table} record did not encode as an object")]
    NotAnObject {
        /// Target table.
        table: &'static str,
    },
}

impl RowCodecError {
    fn malformed(kind: EntityKind, message: impl Into<String>) -> Self {
        Self::Malformed {
            table: kind.table(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BookRow {
    id: BookId,
    title: String,
    author: String,
    category: BookCategory,
    total_copies: u32,
    available_copies: u32,
    #[serde(default)]
    isbn: Option<String>,
    #[serde(default)]
    published_year: Option<i32>,
    #[serde(default)]
    publisher: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    revision: u64,
}

impl From<&Book> for BookRow {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            category: book.category,
            total_copies: book.copies.total(),
            available_copies: book.copies.available(),
            isbn: book.isbn.clone(),
            published_year: book.published_year,
            publisher: book.publisher.clone(),
            created_at: book.created_at,
            updated_at: book.updated_at,
            revision: book.revision,
        }
    }
}

impl TryFrom<BookRow> for Book {
    type Error = RowCodecError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let title = row.title.trim();
        let author = row.author.trim();
        if title.is_empty() || author.is_empty() {
            return Err(RowCodecError::malformed(
                EntityKind::Book,
                "title and author must not be blank",
            ));
        }
        if row.available_copies > row.total_copies {
            return Err(RowCodecError::malformed(
                EntityKind::Book,
                format!(
                    "available_copies {} exceeds total_copies {}",
                    row.available_copies, row.total_copies
                ),
            ));
        }
        Ok(Self {
            id: row.id,
            title: title.to_owned(),
            author: author.to_owned(),
            category: row.category,
            copies: Copies::new(row.total_copies, Some(row.available_copies)),
            isbn: row.isbn,
            published_year: row.published_year,
            publisher: row.publisher,
            created_at: row.created_at,
            updated_at: row.updated_at,
            revision: row.revision,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRow {
    id: UserId,
    email: EmailAddress,
    name: DisplayName,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    revision: u64,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
            revision: user.revision,
        }
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
            revision: row.revision,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TransactionRow {
    id: TransactionId,
    user_id: UserId,
    user_name: String,
    book_id: BookId,
    book_title: String,
    borrow_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    #[serde(default)]
    return_date: Option<DateTime<Utc>>,
    status: TransactionStatus,
    #[serde(default)]
    fine_amount: Money,
    #[serde(default)]
    recorded_by: Option<UserId>,
    #[serde(default)]
    closed_by: Option<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    revision: u64,
}

impl From<&Transaction> for TransactionRow {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id,
            user_id: tx.user_id,
            user_name: tx.user_name.clone(),
            book_id: tx.book_id,
            book_title: tx.book_title.clone(),
            borrow_date: tx.borrow_date,
            due_date: tx.due_date,
            return_date: tx.return_date,
            status: tx.status,
            fine_amount: tx.fine,
            recorded_by: tx.recorded_by,
            closed_by: tx.closed_by,
            created_at: tx.created_at,
            updated_at: tx.updated_at,
            revision: tx.revision,
        }
    }
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = RowCodecError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        if row.due_date <= row.borrow_date {
            return Err(RowCodecError::malformed(
                EntityKind::Transaction,
                "due_date must be after borrow_date",
            ));
        }
        let returned = row.status == TransactionStatus::Returned;
        if returned != row.return_date.is_some() {
            return Err(RowCodecError::malformed(
                EntityKind::Transaction,
                "status and return_date disagree",
            ));
        }
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            book_id: row.book_id,
            book_title: row.book_title,
            borrow_date: row.borrow_date,
            due_date: row.due_date,
            return_date: row.return_date,
            status: row.status,
            fine: row.fine_amount,
            recorded_by: row.recorded_by,
            closed_by: row.closed_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            revision: row.revision,
        })
    }
}

fn to_row<T: Serialize>(kind: EntityKind, value: &T) -> Result<Row, RowCodecError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(_) => Err(RowCodecError::NotAnObject { table: kind.table() }),
        Err(err) => Err(RowCodecError::malformed(kind, err.to_string())),
    }
}

fn from_row<T: DeserializeOwned>(kind: EntityKind, row: Row) -> Result<T, RowCodecError> {
    serde_json::from_value(Value::Object(row))
        .map_err(|err| RowCodecError::malformed(kind, err.to_string()))
}

/// Encode a record as a row of its table.
pub fn encode(record: &Record) -> Result<Row, RowCodecError> {
    let kind = record.kind();
    match record {
        Record::Book(book) => to_row(kind, &BookRow::from(book)),
        Record::User(user) => to_row(kind, &UserRow::from(user)),
        Record::Transaction(tx) => to_row(kind, &TransactionRow::from(tx)),
    }
}

/// Decode a row of `table`.
pub fn decode(table: EntityKind, row: Row) -> Result<Record, RowCodecError> {
    match table {
        EntityKind::Book => from_row::<BookRow>(table, row)
            .and_then(Book::try_from)
            .map(Record::Book),
        EntityKind::User => from_row::<UserRow>(table, row).map(|row| Record::User(row.into())),
        EntityKind::Transaction => from_row::<TransactionRow>(table, row)
            .and_then(Transaction::try_from)
            .map(Record::Transaction),
    }
}

/// Decode a feed notification into a change event.
pub fn decode_event(event: RowEvent) -> Result<ChangeEvent, RowCodecError> {
    let record = decode(event.table, event.row)?;
    Ok(match event.operation {
        ChangeOperation::Insert => ChangeEvent::insert(record),
        ChangeOperation::Update => ChangeEvent::update(record),
        ChangeOperation::Delete => ChangeEvent::delete(record),
    })
}
