//! Failure taxonomy of the catalogue, directory and circulation rules.

use serde_json::json;

use super::{BookId, EntityKind, Error, ErrorCode, TransactionId};

/// Rule violations raised by the stores and the circulation engine.
///
/// Every variant is raised before any state changes, so a failed call leaves
/// the library untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LibraryError {
    /// Malformed or out-of-range input.
    #[error("{field}: {message}")]
    Validation {
        /// Offending field, in wire (camelCase) spelling.
        field: &'static str,
        /// Explanation.
        message: String,
    },
    /// A referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of the missing record.
        entity: EntityKind,
        /// Identifier as supplied.
        id: String,
    },
    /// No copy is left to lend.
    #[error("no copies of book {book_id} are available")]
    Unavailable {
        /// Exhausted title.
        book_id: BookId,
    },
    /// Illegal lifecycle transition.
    #[error("transaction {transaction_id} is already returned")]
    AlreadyReturned {
        /// Closed transaction.
        transaction_id: TransactionId,
    },
    /// The mutation is blocked by other records.
    #[error("{message}")]
    Conflict {
        /// Explanation.
        message: String,
    },
}

impl LibraryError {
    /// Validation failure on `field`.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Missing record.
    pub fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Blocked mutation.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}

impl From<LibraryError> for Error {
    fn from(value: LibraryError) -> Self {
        let message = value.to_string();
        match value {
            LibraryError::Validation { field, .. } => {
                Self::new(ErrorCode::InvalidRequest, message)
                    .with_details(json!({ "field": field, "code": "validation_failed" }))
            }
            LibraryError::NotFound { entity, id } => Self::new(ErrorCode::NotFound, message)
                .with_details(json!({ "entity": entity.as_str(), "id": id })),
            LibraryError::Unavailable { book_id } => {
                Self::new(ErrorCode::CopiesUnavailable, message)
                    .with_details(json!({ "bookId": book_id.to_string() }))
            }
            LibraryError::AlreadyReturned { transaction_id } => {
                Self::new(ErrorCode::InvalidState, message)
                    .with_details(json!({ "transactionId": transaction_id.to_string() }))
            }
            LibraryError::Conflict { .. } => Self::new(ErrorCode::Conflict, message),
        }
    }
}
