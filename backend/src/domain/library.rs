//! The three stores held together under one lock.

use tracing::{debug, warn};

use super::{Catalog, ChangeEvent, ChangeOperation, Directory, Ledger, Record};

/// What merging an external change did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Not newer than the stored row, or nothing to delete.
    Stale,
    /// Merged.
    Applied,
    /// A delete removed a book or user that open loans still reference.
    Orphaned { open_loans: usize },
}

impl ApplyOutcome {
    /// Whether the state changed.
    #[must_use]
    pub const fn changed(self) -> bool {
        !matches!(self, Self::Stale)
    }
}

/// Catalogue, directory and ledger as one consistent aggregate.
#[derive(Debug, Clone, Default)]
pub struct LibraryState {
    /// Books.
    pub catalog: Catalog,
    /// Accounts.
    pub directory: Directory,
    /// Loans.
    pub ledger: Ledger,
}

impl LibraryState {
    /// Merge a change received from outside the process.
    ///
    /// Inserts and updates only replace rows with an older revision, so
    /// redelivered or echoed events are ignored. Deletes remove the row if
    /// present; the row store has already dropped it, so a delete of a book
    /// or user with open loans is applied and flagged as
    /// [`ApplyOutcome::Orphaned`].
    pub fn apply(&mut self, event: &ChangeEvent) -> ApplyOutcome {
        let open_loans = match (event.operation, &event.record) {
            (ChangeOperation::Delete, Record::Book(book)) => self.ledger.open_loans_for_book(&book.id),
            (ChangeOperation::Delete, Record::User(user)) => self.ledger.open_loans_for_user(&user.id),
            _ => 0,
        };
        let applied = match (event.operation, &event.record) {
            (ChangeOperation::Insert | ChangeOperation::Update, Record::Book(book)) => {
                self.catalog.merge(book.clone())
            }
            (ChangeOperation::Insert | ChangeOperation::Update, Record::User(user)) => {
                self.directory.merge(user.clone())
            }
            (ChangeOperation::Insert | ChangeOperation::Update, Record::Transaction(tx)) => {
                self.ledger.merge(tx.clone())
            }
            (ChangeOperation::Delete, Record::Book(book)) => self.catalog.forget(&book.id),
            (ChangeOperation::Delete, Record::User(user)) => self.directory.forget(&user.id),
            (ChangeOperation::Delete, Record::Transaction(tx)) => self.ledger.forget(&tx.id),
        };
        if !applied {
            debug!(
                entity = %event.kind(),
                id = %event.record.id(),
                revision = event.record.revision(),
                "ignored stale change event"
            );
            return ApplyOutcome::Stale;
        }
        if open_loans > 0 {
            warn!(
                entity = %event.kind(),
                id = %event.record.id(),
                open_loans,
                "remote delete removed a record that open loans still reference"
            );
            return ApplyOutcome::Orphaned { open_loans };
        }
        ApplyOutcome::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        BookCategory, BookDraft, BorrowRequest, ChangeEvent, Role, TransactionStatus, UserDraft,
    };
    use chrono::{TimeDelta, Utc};
    use rstest::rstest;

    fn book_event(state: &mut LibraryState) -> ChangeEvent {
        let book = state
            .catalog
            .add_book(
                BookDraft {
                    title: "Pride and Prejudice".to_owned(),
                    author: "Jane Austen".to_owned(),
                    category: BookCategory::Novels,
                    total_copies: 15,
                    available_copies: Some(10),
                    isbn: None,
                    published_year: Some(1813),
                    publisher: Some("Classic Reads".to_owned()),
                },
                Utc::now(),
            )
            .expect("valid draft");
        ChangeEvent::insert(Record::Book(book))
    }

    #[rstest]
    fn echoed_events_are_ignored() {
        let mut state = LibraryState::default();
        let event = book_event(&mut state);
        assert_eq!(state.apply(&event), ApplyOutcome::Stale);
    }

    #[rstest]
    fn newer_revisions_replace_rows_in_arrival_order() {
        let mut source = LibraryState::default();
        let insert = book_event(&mut source);
        let Record::Book(original) = &insert.record else {
            panic!("book event expected");
        };
        let mut renamed = original.clone();
        renamed.title = "Emma".to_owned();
        renamed.revision += 1;

        let mut replica = LibraryState::default();
        assert_eq!(replica.apply(&insert), ApplyOutcome::Applied);
        assert_eq!(
            replica.apply(&ChangeEvent::update(Record::Book(renamed.clone()))),
            ApplyOutcome::Applied
        );
        assert_eq!(replica.apply(&insert), ApplyOutcome::Stale);
        assert_eq!(replica.catalog.get(&original.id), Some(&renamed));
    }

    #[rstest]
    fn deletes_remove_rows() {
        let mut state = LibraryState::default();
        let event = book_event(&mut state);
        let delete = ChangeEvent::delete(event.record.clone());
        assert_eq!(state.apply(&delete), ApplyOutcome::Applied);
        assert!(state.catalog.is_empty());
        assert!(!state.apply(&delete).changed());
    }

    /// Lends the only copy of a fresh book to a fresh user.
    fn lent_book(state: &mut LibraryState) -> (Record, Record) {
        let now = Utc::now();
        let book = state
            .catalog
            .add_book(
                BookDraft {
                    title: "Quantum Physics Explained".to_owned(),
                    author: "Maria Garcia".to_owned(),
                    category: BookCategory::Physics,
                    total_copies: 1,
                    available_copies: None,
                    isbn: None,
                    published_year: None,
                    publisher: None,
                },
                now,
            )
            .expect("valid draft");
        let user = state
            .directory
            .add_user(
                UserDraft {
                    email: "sarah.johnson@library.com".to_owned(),
                    name: "Sarah Johnson".to_owned(),
                    role: Role::Librarian,
                },
                now,
            )
            .expect("valid user");
        let LibraryState {
            catalog,
            directory,
            ledger,
        } = state;
        let outcome = ledger
            .borrow(
                catalog,
                directory,
                BorrowRequest {
                    user_id: user.id,
                    book_id: book.id,
                    borrow_date: None,
                    due_date: None,
                },
                None,
                TimeDelta::days(14),
                now,
            )
            .expect("borrowed");
        assert_eq!(outcome.transaction.status, TransactionStatus::Borrowed);
        (Record::Book(book), Record::User(user))
    }

    #[rstest]
    fn deleting_a_lent_book_is_flagged() {
        let mut state = LibraryState::default();
        let (book, _) = lent_book(&mut state);

        let outcome = state.apply(&ChangeEvent::delete(book));
        assert_eq!(outcome, ApplyOutcome::Orphaned { open_loans: 1 });
        assert!(outcome.changed());
        assert!(state.catalog.is_empty());
        assert_eq!(state.ledger.len(), 1);
    }

    #[rstest]
    fn deleting_a_borrower_is_flagged() {
        let mut state = LibraryState::default();
        let (_, user) = lent_book(&mut state);

        let outcome = state.apply(&ChangeEvent::delete(user));
        assert_eq!(outcome, ApplyOutcome::Orphaned { open_loans: 1 });
        assert!(state.directory.is_empty());
    }
}
