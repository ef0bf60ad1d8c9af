//! Read-only projections over the stores: search, status grouping and the
//! dashboard and report aggregates.
//!
//! Everything here is a pure function of its inputs. Transactions passed in
//! are expected to be recomputed against the current clock already.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Utc};

use super::{Book, BookCategory, BookId, Catalog, Transaction, TransactionStatus, User};

/// Number of titles reported as most borrowed.
pub const MOST_BORROWED_LIMIT: usize = 5;

/// Case-insensitive substring match on any of `fields`. A blank term matches
/// everything.
fn matches_any<'a>(term: &str, fields: impl IntoIterator<Item = &'a str>) -> bool {
    let needle = term.trim().to_lowercase();
    needle.is_empty()
        || fields
            .into_iter()
            .any(|field| field.to_lowercase().contains(&needle))
}

/// Search books on title, author, category and ISBN.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use library_backend::domain::{query, BookCategory, BookDraft, Catalog};
///
/// let mut catalog = Catalog::default();
/// let book = catalog
///     .add_book(
///         BookDraft {
///             title: "Quantum Physics Explained".into(),
///             author: "Maria Garcia".into(),
///             category: BookCategory::Physics,
///             total_copies: 4,
///             available_copies: Some(2),
///             isbn: None,
///             published_year: None,
///             publisher: None,
///         },
///         Utc::now(),
///     )
///     .expect("valid draft");
/// assert!(query::book_matches(&book, "phys"));
/// ```
#[must_use]
pub fn book_matches(book: &Book, term: &str) -> bool {
    matches_any(
        term,
        [
            book.title.as_str(),
            book.author.as_str(),
            book.category.label(),
            book.isbn.as_deref().unwrap_or_default(),
        ],
    )
}

/// Search users on name, email and role.
#[must_use]
pub fn user_matches(user: &User, term: &str) -> bool {
    matches_any(
        term,
        [user.name.as_str(), user.email.as_str(), user.role.as_str()],
    )
}

/// Search transactions on borrower name and book title.
#[must_use]
pub fn transaction_matches(transaction: &Transaction, term: &str) -> bool {
    matches_any(
        term,
        [transaction.user_name.as_str(), transaction.book_title.as_str()],
    )
}

/// Lazily yield the catalogue entries matching `term`.
pub fn search_books<'a>(catalog: &'a Catalog, term: &'a str) -> impl Iterator<Item = &'a Book> + 'a {
    catalog.find_books(move |book| book_matches(book, term))
}

/// Transactions split by status, each list in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusGroups {
    /// Out and not yet due.
    pub borrowed: Vec<Transaction>,
    /// Out past due.
    pub overdue: Vec<Transaction>,
    /// Closed.
    pub returned: Vec<Transaction>,
}

/// Partition transactions by status.
#[must_use]
pub fn group_by_status(transactions: impl IntoIterator<Item = Transaction>) -> StatusGroups {
    let mut groups = StatusGroups::default();
    for transaction in transactions {
        match transaction.status {
            TransactionStatus::Borrowed => groups.borrowed.push(transaction),
            TransactionStatus::Overdue => groups.overdue.push(transaction),
            TransactionStatus::Returned => groups.returned.push(transaction),
        }
    }
    groups
}

/// Headline counters for the dashboard, counted in copies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    /// Copies owned.
    pub total_books: u64,
    /// Copies lent out.
    pub books_borrowed: u64,
    /// Open loans past due.
    pub books_overdue: u64,
    /// Copies on the shelf.
    pub books_available: u64,
}

/// Compute the dashboard counters.
#[must_use]
pub fn dashboard_stats<'a>(
    books: impl IntoIterator<Item = &'a Book>,
    transactions: &[Transaction],
) -> DashboardStats {
    let mut stats = DashboardStats::default();
    for book in books {
        stats.total_books += u64::from(book.copies.total());
        stats.books_available += u64::from(book.copies.available());
        stats.books_borrowed += u64::from(book.copies.on_loan());
    }
    stats.books_overdue = transactions
        .iter()
        .filter(|tx| tx.status == TransactionStatus::Overdue)
        .count() as u64;
    stats
}

/// Dashboard payload: counters plus the loans needing attention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dashboard {
    /// Headline counters.
    pub stats: DashboardStats,
    /// Overdue loans, longest overdue first.
    pub overdue: Vec<Transaction>,
}

/// Build the dashboard from the catalogue and recomputed transactions.
#[must_use]
pub fn dashboard(catalog: &Catalog, transactions: &[Transaction]) -> Dashboard {
    let mut overdue: Vec<Transaction> = transactions
        .iter()
        .filter(|tx| tx.status == TransactionStatus::Overdue)
        .cloned()
        .collect();
    overdue.sort_by_key(|tx| tx.due_date);
    Dashboard {
        stats: dashboard_stats(catalog.find_books(|_| true), transactions),
        overdue,
    }
}

/// Borrow and return counts for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyActivity {
    /// Month as `YYYY-MM`.
    pub month: String,
    /// Loans started in the month.
    pub borrowed: u64,
    /// Loans closed in the month.
    pub returned: u64,
}

/// Count of loans attributed to one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryCount {
    /// Category.
    pub category: BookCategory,
    /// Number of loans.
    pub count: u64,
}

/// Loan count of one title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleCount {
    /// Title.
    pub book_id: BookId,
    /// Title as recorded on the loans.
    pub title: String,
    /// Number of loans.
    pub count: u64,
}

/// Report series over the whole ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reports {
    /// Borrow/return activity per month, oldest first.
    pub monthly_activity: Vec<MonthlyActivity>,
    /// Loans per category.
    pub category_distribution: Vec<CategoryCount>,
    /// Currently overdue loans per category.
    pub overdue_by_category: Vec<CategoryCount>,
    /// Most borrowed titles, busiest first.
    pub most_borrowed: Vec<TitleCount>,
}

fn month_key(date: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

fn per_category<'a>(
    catalog: &Catalog,
    transactions: impl Iterator<Item = &'a Transaction>,
) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<BookCategory, u64> = BTreeMap::new();
    for transaction in transactions {
        // Loans of titles removed since are filed under Other.
        let category = catalog
            .get(&transaction.book_id)
            .map_or(BookCategory::Other, |book| book.category);
        *counts.entry(category).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect()
}

/// Build every report series.
#[must_use]
pub fn reports(catalog: &Catalog, transactions: &[Transaction]) -> Reports {
    let mut months: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for transaction in transactions {
        months.entry(month_key(transaction.borrow_date)).or_default().0 += 1;
        if let Some(returned) = transaction.return_date {
            months.entry(month_key(returned)).or_default().1 += 1;
        }
    }
    let monthly_activity = months
        .into_iter()
        .map(|(month, (borrowed, returned))| MonthlyActivity {
            month,
            borrowed,
            returned,
        })
        .collect();

    let mut titles: HashMap<BookId, TitleCount> = HashMap::new();
    for transaction in transactions {
        titles
            .entry(transaction.book_id)
            .or_insert_with(|| TitleCount {
                book_id: transaction.book_id,
                title: transaction.book_title.clone(),
                count: 0,
            })
            .count += 1;
    }
    let mut most_borrowed: Vec<TitleCount> = titles.into_values().collect();
    most_borrowed.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.title.cmp(&b.title)));
    most_borrowed.truncate(MOST_BORROWED_LIMIT);

    Reports {
        monthly_activity,
        category_distribution: per_category(catalog, transactions.iter()),
        overdue_by_category: per_category(
            catalog,
            transactions
                .iter()
                .filter(|tx| tx.status == TransactionStatus::Overdue),
        ),
        most_borrowed,
    }
}
