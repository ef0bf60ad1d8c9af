//! Borrow transactions and their time-derived status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, FinePolicy, Money, TransactionId, UserId};

/// Lifecycle state of a loan.
///
/// `Overdue` is derived from the clock on every read; only `Returned` is a
/// stored fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Out and not yet due.
    Borrowed,
    /// Closed.
    Returned,
    /// Out past its due date.
    Overdue,
}

impl TransactionStatus {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Borrowed => "borrowed",
            Self::Returned => "returned",
            Self::Overdue => "overdue",
        }
    }
}

/// A single loan of one copy.
///
/// ## Invariants
/// - `status == Returned` exactly when `return_date` is set.
/// - `due_date > borrow_date`.
/// - `fine` is non-zero only for loans that are or were overdue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Stable identifier.
    pub id: TransactionId,
    /// Borrower.
    pub user_id: UserId,
    /// Borrower display name at borrow time.
    pub user_name: String,
    /// Borrowed title.
    pub book_id: BookId,
    /// Title at borrow time.
    pub book_title: String,
    /// Start of the loan.
    pub borrow_date: DateTime<Utc>,
    /// End of the loan period.
    pub due_date: DateTime<Utc>,
    /// When the copy came back.
    pub return_date: Option<DateTime<Utc>>,
    /// Status as of the last recompute.
    pub status: TransactionStatus,
    /// Fine as of the last recompute; frozen once returned.
    pub fine: Money,
    /// Staff member who recorded the loan.
    pub recorded_by: Option<UserId>,
    /// Staff member who recorded the return.
    pub closed_by: Option<UserId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
    /// Monotonic mutation counter.
    pub revision: u64,
}

impl Transaction {
    /// Whether the copy is still out.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.return_date.is_none()
    }

    /// Status and fine as of `now`.
    ///
    /// Pure and idempotent: returned loans keep their frozen fine, open loans
    /// past due accrue the policy's fine as of `now`, and everything else is
    /// borrowed with no fine.
    #[must_use]
    pub fn recompute_status(&self, now: DateTime<Utc>, policy: &dyn FinePolicy) -> Self {
        let (status, fine) = if self.return_date.is_some() {
            (TransactionStatus::Returned, self.fine)
        } else if now > self.due_date {
            (TransactionStatus::Overdue, policy.fine_for(now - self.due_date))
        } else {
            (TransactionStatus::Borrowed, Money::ZERO)
        };
        Self {
            status,
            fine,
            ..self.clone()
        }
    }
}
