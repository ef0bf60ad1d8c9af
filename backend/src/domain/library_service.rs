//! Library service: the stores behind one lock, driven through the ports.
//!
//! Every mutation takes the write lock, validates fully, commits, then hands
//! the resulting change events to the outbox (row-store mirror) and to live
//! subscribers while still holding the lock, so both observe commit order.
//! No I/O happens under the lock.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use crate::domain::ports::{
    CatalogService, ChangeFeed, CirculationService, ReportsQuery, TransactionFilter,
};
use crate::domain::query::{self, Dashboard, Reports};
use crate::domain::{
    Actor, ApplyOutcome, Book, BookDraft, BookId, BookPatch, BorrowRequest, ChangeEvent, EntityKind, Error,
    FinePolicy, LibraryError, LibraryState, Record, Role, Transaction, TransactionId, User,
    UserDraft, UserId, UserPatch,
};

/// Buffered events per live subscriber before it starts lagging.
pub const CHANGE_FEED_CAPACITY: usize = 256;

/// Loan rules taken from configuration.
#[derive(Clone)]
pub struct CirculationRules {
    /// Default loan length when a borrow names no due date.
    pub loan_period: TimeDelta,
    /// Rate function for late returns.
    pub fine_policy: Arc<dyn FinePolicy>,
}

/// Process-wide library state and the use-cases over it.
pub struct LibraryService {
    state: RwLock<LibraryState>,
    clock: Arc<dyn Clock>,
    rules: CirculationRules,
    outbox: Option<mpsc::UnboundedSender<ChangeEvent>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl LibraryService {
    /// Empty library reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>, rules: CirculationRules) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            state: RwLock::new(LibraryState::default()),
            clock,
            rules,
            outbox: None,
            changes,
        }
    }

    /// Forward every local commit to `outbox`, in commit order.
    #[must_use]
    pub fn with_outbox(mut self, outbox: mpsc::UnboundedSender<ChangeEvent>) -> Self {
        self.outbox = Some(outbox);
        self
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LibraryState>, Error> {
        self.state
            .read()
            .map_err(|_| Error::internal("library state lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LibraryState>, Error> {
        self.state
            .write()
            .map_err(|_| Error::internal("library state lock poisoned"))
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    /// Must be called while the write lock is held.
    fn publish(&self, events: impl IntoIterator<Item = ChangeEvent>) {
        for event in events {
            let mirrored = self
                .outbox
                .as_ref()
                .is_none_or(|outbox| outbox.send(event.clone()).is_ok());
            if !mirrored {
                warn!(entity = %event.kind(), id = %event.record.id(), "outbox closed; change not mirrored");
            }
            // Nobody listening is not an error.
            self.changes.send(event).ok();
        }
    }

    /// Merge a change received from the row store.
    ///
    /// Applied events are forwarded to live subscribers but never back to the
    /// outbox.
    pub fn apply_external(&self, event: ChangeEvent) -> Result<ApplyOutcome, Error> {
        let mut state = self.write()?;
        let outcome = state.apply(&event);
        if outcome.changed() {
            self.changes.send(event).ok();
        }
        Ok(outcome)
    }

    /// Consistent copy of the whole state.
    pub fn snapshot(&self) -> Result<LibraryState, Error> {
        Ok(self.read()?.clone())
    }

    fn recomputed(&self, transactions: impl Iterator<Item = Transaction>) -> Vec<Transaction> {
        let now = self.now();
        transactions
            .map(|tx| tx.recompute_status(now, self.rules.fine_policy.as_ref()))
            .collect()
    }

    fn all_transactions(&self, state: &LibraryState) -> Vec<Transaction> {
        self.recomputed(state.ledger.iter().cloned())
    }

    /// Look up a user without a capability check, for session resolution.
    pub fn user(&self, id: &UserId) -> Result<Option<User>, Error> {
        Ok(self.read()?.directory.get(id).cloned())
    }

    /// Look up a user by email without a capability check, for sign-in.
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        Ok(self.read()?.directory.find_by_email(email).cloned())
    }

    /// Users matching `term`, ordered by name.
    pub fn list_users(&self, actor: &Actor, term: &str) -> Result<Vec<User>, Error> {
        actor.require(Role::Librarian)?;
        let state = self.read()?;
        let mut users: Vec<User> = state
            .directory
            .find_users(|user| query::user_matches(user, term))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        Ok(users)
    }

    /// One user.
    pub fn get_user(&self, actor: &Actor, id: &UserId) -> Result<User, Error> {
        actor.require(Role::Librarian)?;
        self.read()?
            .directory
            .get(id)
            .cloned()
            .ok_or_else(|| LibraryError::not_found(EntityKind::User, id).into())
    }

    /// Create an account. Admin only.
    pub fn add_user(&self, actor: &Actor, draft: UserDraft) -> Result<User, Error> {
        actor.require(Role::Admin)?;
        let now = self.now();
        let mut state = self.write()?;
        let user = state.directory.add_user(draft, now)?;
        info!(user_id = %user.id, role = %user.role, actor = %actor.user_id, "user added");
        self.publish([ChangeEvent::insert(Record::User(user.clone()))]);
        Ok(user)
    }

    /// Edit an account. Admin only.
    pub fn update_user(&self, actor: &Actor, id: &UserId, patch: UserPatch) -> Result<User, Error> {
        actor.require(Role::Admin)?;
        let now = self.now();
        let mut state = self.write()?;
        let user = state.directory.update_user(id, patch, now)?;
        info!(user_id = %user.id, actor = %actor.user_id, "user updated");
        self.publish([ChangeEvent::update(Record::User(user.clone()))]);
        Ok(user)
    }

    /// Remove an account without open loans. Admin only.
    pub fn remove_user(&self, actor: &Actor, id: &UserId) -> Result<User, Error> {
        actor.require(Role::Admin)?;
        let mut state = self.write()?;
        let LibraryState {
            directory, ledger, ..
        } = &mut *state;
        let user = directory.remove_user(id, ledger)?;
        info!(user_id = %user.id, actor = %actor.user_id, "user removed");
        self.publish([ChangeEvent::delete(Record::User(user.clone()))]);
        Ok(user)
    }

    /// Put an account back as it was before a half-finished edit.
    ///
    /// The restored row gets a fresh revision so mirrors take it over the edit.
    pub(crate) fn restore_user(&self, before: &User) -> Result<(), Error> {
        let now = self.now();
        let mut state = self.write()?;
        let Some(revision) = state.directory.get(&before.id).map(|user| user.revision) else {
            return Ok(());
        };
        let restored = User {
            revision: revision.saturating_add(1),
            updated_at: now,
            ..before.clone()
        };
        state.directory.merge(restored.clone());
        self.publish([ChangeEvent::update(Record::User(restored))]);
        Ok(())
    }

    /// Drop an account without rule checks, undoing a half-finished creation.
    pub(crate) fn discard_user(&self, id: &UserId) -> Result<(), Error> {
        let mut state = self.write()?;
        let Some(user) = state.directory.get(id).cloned() else {
            return Ok(());
        };
        state.directory.forget(id);
        self.publish([ChangeEvent::delete(Record::User(user))]);
        Ok(())
    }
}

#[async_trait]
impl CatalogService for LibraryService {
    async fn list_books(&self, actor: &Actor, term: &str) -> Result<Vec<Book>, Error> {
        actor.require(Role::Librarian)?;
        let state = self.read()?;
        let mut books: Vec<Book> = query::search_books(&state.catalog, term).cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(books)
    }

    async fn get_book(&self, actor: &Actor, id: &BookId) -> Result<Book, Error> {
        actor.require(Role::Librarian)?;
        self.read()?
            .catalog
            .get(id)
            .cloned()
            .ok_or_else(|| LibraryError::not_found(EntityKind::Book, id).into())
    }

    async fn add_book(&self, actor: &Actor, draft: BookDraft) -> Result<Book, Error> {
        actor.require(Role::Librarian)?;
        let now = self.now();
        let mut state = self.write()?;
        let book = state.catalog.add_book(draft, now)?;
        info!(book_id = %book.id, actor = %actor.user_id, "book added");
        self.publish([ChangeEvent::insert(Record::Book(book.clone()))]);
        Ok(book)
    }

    async fn update_book(
        &self,
        actor: &Actor,
        id: &BookId,
        patch: BookPatch,
    ) -> Result<Book, Error> {
        actor.require(Role::Librarian)?;
        let now = self.now();
        let mut state = self.write()?;
        let book = state.catalog.update_book(id, patch, now)?;
        info!(book_id = %book.id, actor = %actor.user_id, "book updated");
        self.publish([ChangeEvent::update(Record::Book(book.clone()))]);
        Ok(book)
    }

    async fn remove_book(&self, actor: &Actor, id: &BookId) -> Result<Book, Error> {
        actor.require(Role::Librarian)?;
        let mut state = self.write()?;
        let LibraryState {
            catalog, ledger, ..
        } = &mut *state;
        let book = catalog.remove_book(id, ledger)?;
        info!(book_id = %book.id, actor = %actor.user_id, "book removed");
        self.publish([ChangeEvent::delete(Record::Book(book.clone()))]);
        Ok(book)
    }
}

#[async_trait]
impl CirculationService for LibraryService {
    async fn list_transactions(
        &self,
        actor: &Actor,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, Error> {
        actor.require(Role::Librarian)?;
        let mut transactions: Vec<Transaction> = {
            let state = self.read()?;
            self.all_transactions(&state)
        };
        transactions.retain(|tx| filter.matches(tx));
        transactions.sort_by(|a, b| b.borrow_date.cmp(&a.borrow_date));
        Ok(transactions)
    }

    async fn get_transaction(
        &self,
        actor: &Actor,
        id: &TransactionId,
    ) -> Result<Transaction, Error> {
        actor.require(Role::Librarian)?;
        let stored = self
            .read()?
            .ledger
            .get(id)
            .cloned()
            .ok_or_else(|| LibraryError::not_found(EntityKind::Transaction, id))?;
        Ok(stored.recompute_status(self.now(), self.rules.fine_policy.as_ref()))
    }

    async fn borrow(&self, actor: &Actor, request: BorrowRequest) -> Result<Transaction, Error> {
        actor.require(Role::Librarian)?;
        let now = self.now();
        let mut state = self.write()?;
        let LibraryState {
            catalog,
            directory,
            ledger,
        } = &mut *state;
        let outcome = ledger.borrow(
            catalog,
            directory,
            request,
            Some(actor.user_id),
            self.rules.loan_period,
            now,
        )?;
        info!(
            transaction_id = %outcome.transaction.id,
            book_id = %outcome.book.id,
            user_id = %outcome.transaction.user_id,
            available = outcome.book.copies.available(),
            "loan recorded"
        );
        self.publish([
            ChangeEvent::update(Record::Book(outcome.book)),
            ChangeEvent::insert(Record::Transaction(outcome.transaction.clone())),
        ]);
        Ok(outcome.transaction)
    }

    async fn record_return(
        &self,
        actor: &Actor,
        id: &TransactionId,
        return_date: Option<DateTime<Utc>>,
    ) -> Result<Transaction, Error> {
        actor.require(Role::Librarian)?;
        let now = self.now();
        let mut state = self.write()?;
        let LibraryState {
            catalog, ledger, ..
        } = &mut *state;
        let outcome = ledger.record_return(
            catalog,
            id,
            return_date.unwrap_or(now),
            Some(actor.user_id),
            self.rules.fine_policy.as_ref(),
            now,
        )?;
        info!(
            transaction_id = %outcome.transaction.id,
            fine = %outcome.transaction.fine,
            "return recorded"
        );
        let mut events = vec![ChangeEvent::update(Record::Transaction(
            outcome.transaction.clone(),
        ))];
        events.extend(outcome.book.map(|book| ChangeEvent::update(Record::Book(book))));
        self.publish(events);
        Ok(outcome.transaction)
    }
}

#[async_trait]
impl ReportsQuery for LibraryService {
    async fn dashboard(&self, actor: &Actor) -> Result<Dashboard, Error> {
        actor.require(Role::Librarian)?;
        let state = self.read()?;
        let transactions = self.all_transactions(&state);
        Ok(query::dashboard(&state.catalog, &transactions))
    }

    async fn reports(&self, actor: &Actor) -> Result<Reports, Error> {
        actor.require(Role::Librarian)?;
        let state = self.read()?;
        let transactions = self.all_transactions(&state);
        Ok(query::reports(&state.catalog, &transactions))
    }
}

impl ChangeFeed for LibraryService {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
#[path = "library_service_tests.rs"]
mod tests;
