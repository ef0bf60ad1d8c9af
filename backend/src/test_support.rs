//! Test doubles shared by unit tests (in `src/`) and integration tests (in
//! `tests/`).

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::{
    Actor, Book, BookCategory, BookId, CirculationRules, Copies, FlatDailyFine, LibraryService,
    Money, Role, UserId,
};

/// Clock frozen at a settable instant.
#[derive(Debug)]
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Clock reading `now` until moved.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        *self.lock_clock() += delta;
    }

    /// Jump to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.lock_clock() = instant;
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Library charging one unit per started day late with 14-day loans.
pub fn library_at(clock: Arc<MutableClock>) -> LibraryService {
    LibraryService::new(
        clock,
        CirculationRules {
            loan_period: TimeDelta::days(14),
            fine_policy: Arc::new(FlatDailyFine::new(Money::from_cents(100), None)),
        },
    )
}

/// Actor not backed by any directory row, for exercising capability checks.
pub fn detached_actor(role: Role) -> Actor {
    Actor {
        user_id: UserId::random(),
        name: format!("Detached {role}"),
        role,
    }
}

/// Standalone catalogue row with two copies on the shelf.
pub fn sample_book(title: &str, category: BookCategory) -> Book {
    let now = Utc::now();
    Book {
        id: BookId::random(),
        title: title.to_owned(),
        author: "Sample Author".to_owned(),
        category,
        copies: Copies::new(2, None),
        isbn: None,
        published_year: Some(2021),
        publisher: None,
        created_at: now,
        updated_at: now,
        revision: 1,
    }
}
