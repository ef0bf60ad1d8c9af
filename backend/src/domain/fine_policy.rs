//! Late-return charges.
//!
//! The rate is configuration, not domain logic: services receive an
//! `Arc<dyn FinePolicy>` built from settings at start-up.

use chrono::TimeDelta;

use super::Money;

/// Rate function mapping lateness to a fine.
#[cfg_attr(test, mockall::automock)]
pub trait FinePolicy: Send + Sync {
    /// Fine owed for a loan `overdue_by` past its due date.
    ///
    /// Must return [`Money::ZERO`] for zero or negative durations.
    fn fine_for(&self, overdue_by: TimeDelta) -> Money;
}

/// Flat charge per started day late, with an optional ceiling.
///
/// # Examples
/// ```
/// use chrono::TimeDelta;
/// use library_backend::domain::{FinePolicy, FlatDailyFine, Money};
///
/// let policy = FlatDailyFine::new(Money::from_cents(100), None);
/// assert_eq!(policy.fine_for(TimeDelta::days(6)), Money::from_cents(600));
/// assert_eq!(policy.fine_for(TimeDelta::hours(1)), Money::from_cents(100));
/// assert_eq!(policy.fine_for(TimeDelta::zero()), Money::ZERO);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatDailyFine {
    per_day: Money,
    cap: Option<Money>,
}

impl FlatDailyFine {
    /// Charge `per_day` for each started day, never more than `cap`.
    #[must_use]
    pub const fn new(per_day: Money, cap: Option<Money>) -> Self {
        Self { per_day, cap }
    }

    /// Daily rate.
    #[must_use]
    pub const fn per_day(&self) -> Money {
        self.per_day
    }

    /// Ceiling, if any.
    #[must_use]
    pub const fn cap(&self) -> Option<Money> {
        self.cap
    }
}

impl FinePolicy for FlatDailyFine {
    fn fine_for(&self, overdue_by: TimeDelta) -> Money {
        if overdue_by <= TimeDelta::zero() {
            return Money::ZERO;
        }
        let whole = overdue_by.num_days();
        // Any remainder, down to the nanosecond, starts another day.
        let started = if overdue_by > TimeDelta::days(whole) {
            whole.saturating_add(1)
        } else {
            whole
        };
        let days = u64::try_from(started).unwrap_or(u64::MAX);
        let fine = self.per_day.saturating_times(days);
        self.cap.map_or(fine, |cap| fine.min(cap))
    }
}
