//! Circulation engine: the loan ledger and the borrow/return rules that keep
//! it consistent with the catalogue.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::warn;

use super::{
    BookId, Catalog, Directory, EntityKind, FinePolicy, LibraryError, Money, Transaction,
    TransactionId, TransactionStatus, UserId,
};

/// Request to lend one copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowRequest {
    /// Borrower.
    pub user_id: UserId,
    /// Title to lend.
    pub book_id: BookId,
    /// Start of the loan; defaults to now.
    pub borrow_date: Option<DateTime<Utc>>,
    /// End of the loan; defaults to `borrow_date` plus the loan period.
    pub due_date: Option<DateTime<Utc>>,
}

/// Outcome of a return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnOutcome {
    /// Closed transaction.
    pub transaction: Transaction,
    /// Book after the copy went back; `None` when the title has gone.
    pub book: Option<super::Book>,
}

/// Outcome of a borrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowOutcome {
    /// New transaction.
    pub transaction: Transaction,
    /// Book after the copy left the shelf.
    pub book: super::Book,
}

/// Every loan ever recorded. Transactions are never deleted by the engine.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    transactions: BTreeMap<TransactionId, Transaction>,
}

impl Ledger {
    /// Look up a transaction as stored (status as of its last mutation).
    #[must_use]
    pub fn get(&self, id: &TransactionId) -> Option<&Transaction> {
        self.transactions.get(id)
    }

    /// Every stored transaction.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.values()
    }

    /// Number of transactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether no loan was ever recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Open loans of `book_id`.
    #[must_use]
    pub fn open_loans_for_book(&self, book_id: &BookId) -> usize {
        self.iter()
            .filter(|tx| tx.is_open() && &tx.book_id == book_id)
            .count()
    }

    /// Open loans held by `user_id`.
    #[must_use]
    pub fn open_loans_for_user(&self, user_id: &UserId) -> usize {
        self.iter()
            .filter(|tx| tx.is_open() && &tx.user_id == user_id)
            .count()
    }

    /// Lend one copy of a book.
    ///
    /// Checks run before anything changes: a missing user or book is
    /// `NotFound`, an exhausted title is `Unavailable`, and a due date not
    /// after the borrow date is a validation failure.
    pub fn borrow(
        &mut self,
        catalog: &mut Catalog,
        directory: &Directory,
        request: BorrowRequest,
        recorded_by: Option<UserId>,
        loan_period: TimeDelta,
        now: DateTime<Utc>,
    ) -> Result<BorrowOutcome, LibraryError> {
        let user = directory
            .get(&request.user_id)
            .ok_or_else(|| LibraryError::not_found(EntityKind::User, request.user_id))?;
        let book = catalog
            .get(&request.book_id)
            .ok_or_else(|| LibraryError::not_found(EntityKind::Book, request.book_id))?;
        if book.copies.available() == 0 {
            return Err(LibraryError::Unavailable {
                book_id: request.book_id,
            });
        }

        let borrow_date = request.borrow_date.unwrap_or(now);
        let due_date = request.due_date.unwrap_or(borrow_date + loan_period);
        if due_date <= borrow_date {
            return Err(LibraryError::validation(
                "dueDate",
                "must be later than borrowDate",
            ));
        }

        let transaction = Transaction {
            id: TransactionId::random(),
            user_id: user.id,
            user_name: user.name.to_string(),
            book_id: book.id,
            book_title: book.title.clone(),
            borrow_date,
            due_date,
            return_date: None,
            status: TransactionStatus::Borrowed,
            fine: Money::ZERO,
            recorded_by,
            closed_by: None,
            created_at: now,
            updated_at: now,
            revision: 1,
        };
        let book = catalog.checkout(&request.book_id, now)?.clone();
        self.transactions.insert(transaction.id, transaction.clone());
        Ok(BorrowOutcome { transaction, book })
    }

    /// Close a loan and put the copy back on the shelf.
    ///
    /// The fine is fixed from the lateness at `return_date` and never grows
    /// afterwards.
    pub fn record_return(
        &mut self,
        catalog: &mut Catalog,
        id: &TransactionId,
        return_date: DateTime<Utc>,
        closed_by: Option<UserId>,
        policy: &dyn FinePolicy,
        now: DateTime<Utc>,
    ) -> Result<ReturnOutcome, LibraryError> {
        let current = self
            .transactions
            .get(id)
            .ok_or_else(|| LibraryError::not_found(EntityKind::Transaction, id))?;
        if !current.is_open() {
            return Err(LibraryError::AlreadyReturned {
                transaction_id: *id,
            });
        }
        if return_date < current.borrow_date {
            return Err(LibraryError::validation(
                "returnDate",
                "must not be earlier than borrowDate",
            ));
        }

        let mut closed = current.clone();
        closed.fine = policy.fine_for(return_date - closed.due_date);
        closed.return_date = Some(return_date);
        closed.status = TransactionStatus::Returned;
        closed.closed_by = closed_by;
        closed.updated_at = now;
        closed.revision = current.revision.saturating_add(1);

        let book = catalog.checkin(&closed.book_id, now).cloned();
        if book.is_none() {
            warn!(
                transaction_id = %closed.id,
                book_id = %closed.book_id,
                "returned copy belongs to a book no longer in the catalogue"
            );
        }
        self.transactions.insert(closed.id, closed.clone());
        Ok(ReturnOutcome {
            transaction: closed,
            book,
        })
    }

    /// Store a row received from outside, keeping the newest revision.
    pub(crate) fn merge(&mut self, transaction: Transaction) -> bool {
        match self.transactions.get(&transaction.id) {
            Some(existing) if existing.revision >= transaction.revision => false,
            _ => {
                self.transactions.insert(transaction.id, transaction);
                true
            }
        }
    }

    /// Drop a row deleted outside; returns whether it was present.
    pub(crate) fn forget(&mut self, id: &TransactionId) -> bool {
        self.transactions.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        BookCategory, BookDraft, FlatDailyFine, Role, UserDraft,
    };
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    struct Library {
        catalog: Catalog,
        directory: Directory,
        ledger: Ledger,
        book: BookId,
        user: UserId,
    }

    #[fixture]
    fn day0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 45, 0)
            .single()
            .expect("valid timestamp")
    }

    #[fixture]
    fn policy() -> FlatDailyFine {
        FlatDailyFine::new(Money::from_cents(100), None)
    }

    #[fixture]
    fn library(day0: DateTime<Utc>) -> Library {
        let mut catalog = Catalog::default();
        let mut directory = Directory::default();
        let book = catalog
            .add_book(
                BookDraft {
                    title: "Introduction to Human Biology".to_owned(),
                    author: "Jane Smith".to_owned(),
                    category: BookCategory::HumanScience,
                    total_copies: 1,
                    available_copies: Some(1),
                    isbn: None,
                    published_year: None,
                    publisher: None,
                },
                day0,
            )
            .expect("book");
        let user = directory
            .add_user(
                UserDraft {
                    email: "sarah.johnson@library.com".to_owned(),
                    name: "Sarah Johnson".to_owned(),
                    role: Role::Librarian,
                },
                day0,
            )
            .expect("user");
        Library {
            catalog,
            directory,
            ledger: Ledger::default(),
            book: book.id,
            user: user.id,
        }
    }

    fn request(lib: &Library, day0: DateTime<Utc>, due_in: TimeDelta) -> BorrowRequest {
        BorrowRequest {
            user_id: lib.user,
            book_id: lib.book,
            borrow_date: Some(day0),
            due_date: Some(day0 + due_in),
        }
    }

    fn available(lib: &Library) -> u32 {
        lib.catalog
            .get(&lib.book)
            .map(|book| book.copies.available())
            .unwrap_or_default()
    }

    fn borrow(lib: &mut Library, req: BorrowRequest, now: DateTime<Utc>) -> Result<BorrowOutcome, LibraryError> {
        lib.ledger
            .borrow(&mut lib.catalog, &lib.directory, req, None, TimeDelta::days(14), now)
    }

    #[rstest]
    fn lifecycle_from_borrow_to_fined_return(
        mut library: Library,
        day0: DateTime<Utc>,
        policy: FlatDailyFine,
    ) {
        let req = request(&library, day0, TimeDelta::days(14));
        let outcome = borrow(&mut library, req, day0).expect("borrow");
        assert_eq!(available(&library), 0);
        assert_eq!(outcome.transaction.status, TransactionStatus::Borrowed);
        assert_eq!(outcome.transaction.fine, Money::ZERO);

        let day20 = day0 + TimeDelta::days(20);
        let overdue = outcome.transaction.recompute_status(day20, &policy);
        assert_eq!(overdue.status, TransactionStatus::Overdue);
        assert_eq!(overdue.fine, Money::from_cents(600));

        let returned = library
            .ledger
            .record_return(&mut library.catalog, &overdue.id, day20, None, &policy, day20)
            .expect("return");
        assert_eq!(returned.transaction.status, TransactionStatus::Returned);
        assert_eq!(returned.transaction.fine, Money::from_cents(600));
        assert_eq!(available(&library), 1);

        let much_later = returned
            .transaction
            .recompute_status(day0 + TimeDelta::days(60), &policy);
        assert_eq!(much_later.fine, Money::from_cents(600));
    }

    #[rstest]
    fn borrowing_an_exhausted_title_changes_nothing(mut library: Library, day0: DateTime<Utc>) {
        let req = request(&library, day0, TimeDelta::days(14));
        borrow(&mut library, req.clone(), day0).expect("first borrow");
        let err = borrow(&mut library, req, day0).expect_err("no copies left");
        assert!(matches!(err, LibraryError::Unavailable { .. }));
        assert_eq!(library.ledger.len(), 1);
        assert_eq!(available(&library), 0);
    }

    #[rstest]
    #[case(TimeDelta::zero())]
    #[case(TimeDelta::days(-1))]
    fn due_date_must_follow_borrow_date(
        mut library: Library,
        day0: DateTime<Utc>,
        #[case] due_in: TimeDelta,
    ) {
        let req = request(&library, day0, due_in);
        let err = borrow(&mut library, req, day0).expect_err("invalid dates");
        assert!(matches!(err, LibraryError::Validation { field: "dueDate", .. }));
        assert!(library.ledger.is_empty());
        assert_eq!(available(&library), 1);
    }

    #[rstest]
    fn missing_user_or_book_is_not_found(mut library: Library, day0: DateTime<Utc>) {
        let mut req = request(&library, day0, TimeDelta::days(14));
        req.user_id = UserId::random();
        assert!(matches!(
            borrow(&mut library, req, day0),
            Err(LibraryError::NotFound { entity: EntityKind::User, .. })
        ));

        let mut req = request(&library, day0, TimeDelta::days(14));
        req.book_id = BookId::random();
        assert!(matches!(
            borrow(&mut library, req, day0),
            Err(LibraryError::NotFound { entity: EntityKind::Book, .. })
        ));
    }

    #[rstest]
    fn omitted_dates_use_now_and_the_loan_period(mut library: Library, day0: DateTime<Utc>) {
        let req = BorrowRequest {
            user_id: library.user,
            book_id: library.book,
            borrow_date: None,
            due_date: None,
        };
        let outcome = borrow(&mut library, req, day0).expect("borrow");
        assert_eq!(outcome.transaction.borrow_date, day0);
        assert_eq!(outcome.transaction.due_date, day0 + TimeDelta::days(14));
    }

    #[rstest]
    fn round_trip_restores_availability(
        mut library: Library,
        day0: DateTime<Utc>,
        policy: FlatDailyFine,
    ) {
        let before = available(&library);
        let req = request(&library, day0, TimeDelta::days(14));
        let outcome = borrow(&mut library, req, day0).expect("borrow");
        let returned = library
            .ledger
            .record_return(&mut library.catalog, &outcome.transaction.id, day0, None, &policy, day0)
            .expect("return");
        assert_eq!(available(&library), before);
        assert_eq!(returned.transaction.fine, Money::ZERO);
        assert!(returned.transaction.return_date.is_some());
    }

    #[rstest]
    fn returning_twice_is_a_state_error(
        mut library: Library,
        day0: DateTime<Utc>,
        policy: FlatDailyFine,
    ) {
        let req = request(&library, day0, TimeDelta::days(14));
        let id = borrow(&mut library, req, day0).expect("borrow").transaction.id;
        library
            .ledger
            .record_return(&mut library.catalog, &id, day0, None, &policy, day0)
            .expect("first return");
        let err = library
            .ledger
            .record_return(&mut library.catalog, &id, day0, None, &policy, day0)
            .expect_err("second return");
        assert!(matches!(err, LibraryError::AlreadyReturned { .. }));
        assert_eq!(available(&library), 1);
    }

    #[rstest]
    fn return_before_borrow_is_rejected(
        mut library: Library,
        day0: DateTime<Utc>,
        policy: FlatDailyFine,
    ) {
        let req = request(&library, day0, TimeDelta::days(14));
        let id = borrow(&mut library, req, day0).expect("borrow").transaction.id;
        let err = library
            .ledger
            .record_return(
                &mut library.catalog,
                &id,
                day0 - TimeDelta::hours(1),
                None,
                &policy,
                day0,
            )
            .expect_err("too early");
        assert!(matches!(err, LibraryError::Validation { field: "returnDate", .. }));
        assert!(library.ledger.get(&id).is_some_and(Transaction::is_open));
    }

    #[rstest]
    fn open_loans_block_removals(mut library: Library, day0: DateTime<Utc>) {
        let req = request(&library, day0, TimeDelta::days(14));
        borrow(&mut library, req, day0).expect("borrow");
        assert!(matches!(
            library.catalog.remove_book(&library.book, &library.ledger),
            Err(LibraryError::Conflict { .. })
        ));
        assert!(matches!(
            library.directory.remove_user(&library.user, &library.ledger),
            Err(LibraryError::Conflict { .. })
        ));
    }

    #[rstest]
    fn returns_close_even_when_the_book_vanished(
        mut library: Library,
        day0: DateTime<Utc>,
        policy: FlatDailyFine,
    ) {
        let req = request(&library, day0, TimeDelta::days(14));
        let id = borrow(&mut library, req, day0).expect("borrow").transaction.id;
        assert!(library.catalog.forget(&library.book));

        let outcome = library
            .ledger
            .record_return(&mut library.catalog, &id, day0, None, &policy, day0)
            .expect("return");
        assert!(outcome.book.is_none());
        assert_eq!(outcome.transaction.status, TransactionStatus::Returned);
    }
}
