//! Driving port for borrow/return use-cases.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Actor, BookId, BorrowRequest, Error, Transaction, TransactionId, TransactionStatus, UserId,
};

/// Narrowing applied when listing transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Substring matched against borrower name and book title.
    pub term: String,
    /// Only loans in this status, evaluated against the current clock.
    pub status: Option<TransactionStatus>,
    /// Only loans of this borrower.
    pub user_id: Option<UserId>,
    /// Only loans of this title.
    pub book_id: Option<BookId>,
}

impl TransactionFilter {
    /// Whether `transaction` passes every condition.
    #[must_use]
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.status.is_none_or(|status| transaction.status == status)
            && self.user_id.is_none_or(|id| transaction.user_id == id)
            && self.book_id.is_none_or(|id| transaction.book_id == id)
            && crate::domain::query::transaction_matches(transaction, &self.term)
    }
}

/// Domain use-case port for the loan lifecycle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CirculationService: Send + Sync {
    /// Loans matching `filter`, newest first, with status recomputed now.
    async fn list_transactions(
        &self,
        actor: &Actor,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, Error>;

    /// One loan, with status recomputed now.
    async fn get_transaction(&self, actor: &Actor, id: &TransactionId)
    -> Result<Transaction, Error>;

    /// Lend one copy, attributing the loan to `actor`.
    async fn borrow(&self, actor: &Actor, request: BorrowRequest) -> Result<Transaction, Error>;

    /// Close a loan; `return_date` defaults to now.
    async fn record_return(
        &self,
        actor: &Actor,
        id: &TransactionId,
        return_date: Option<DateTime<Utc>>,
    ) -> Result<Transaction, Error>;
}
