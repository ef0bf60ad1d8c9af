//! Demo data for a fresh row store.
//!
//! Seeds the console's staff accounts (with passwords) and its sample
//! catalogue, so a new deployment can be signed into straight away.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::domain::ports::{AuthProvider, AuthProviderError, RowFilter, RowStore, RowStoreError};
use crate::domain::{
    Book, BookCategory, BookId, Copies, DisplayName, EmailAddress, EntityKind,
    LoginValidationError, Password, Record, Role, User, UserId, UserValidationError,
};

use super::row_store::codec::{self, RowCodecError};

struct DemoAccount {
    email: &'static str,
    name: &'static str,
    role: Role,
    password: &'static str,
}

const DEMO_ACCOUNTS: [DemoAccount; 4] = [
    DemoAccount {
        email: "admin@library.com",
        name: "Admin User",
        role: Role::Admin,
        password: "admin123",
    },
    DemoAccount {
        email: "librarian@library.com",
        name: "Librarian User",
        role: Role::Librarian,
        password: "librarian123",
    },
    DemoAccount {
        email: "sarah.johnson@library.com",
        name: "Sarah Johnson",
        role: Role::Librarian,
        password: "librarian123",
    },
    DemoAccount {
        email: "michael.smith@library.com",
        name: "Michael Smith",
        role: Role::Librarian,
        password: "librarian123",
    },
];

struct DemoBook {
    title: &'static str,
    author: &'static str,
    category: BookCategory,
    total: u32,
    available: u32,
    isbn: &'static str,
    published_year: i32,
    publisher: &'static str,
}

const DEMO_BOOKS: [DemoBook; 5] = [
    DemoBook {
        title: "Introduction to Human Biology",
        author: "Jane Smith",
        category: BookCategory::HumanScience,
        total: 5,
        available: 3,
        isbn: "978-3-16-148410-0",
        published_year: 2020,
        publisher: "Science Press",
    },
    DemoBook {
        title: "Advanced Calculus",
        author: "John Doe",
        category: BookCategory::Maths,
        total: 8,
        available: 5,
        isbn: "978-1-4028-9462-6",
        published_year: 2018,
        publisher: "Math Publications",
    },
    DemoBook {
        title: "Organic Chemistry Fundamentals",
        author: "Robert Johnson",
        category: BookCategory::Chemistry,
        total: 10,
        available: 0,
        isbn: "978-0-7645-7018-7",
        published_year: 2019,
        publisher: "Chemistry House",
    },
    DemoBook {
        title: "Quantum Physics Explained",
        author: "Maria Garcia",
        category: BookCategory::Physics,
        total: 4,
        available: 2,
        isbn: "978-3-642-11934-7",
        published_year: 2021,
        publisher: "Physics World",
    },
    DemoBook {
        title: "Pride and Prejudice",
        author: "Jane Austen",
        category: BookCategory::Novels,
        total: 15,
        available: 10,
        isbn: "978-0-141-43951-8",
        published_year: 1813,
        publisher: "Classic Reads",
    },
];

/// Counts of seeded records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Accounts written.
    pub users: usize,
    /// Books written.
    pub books: usize,
}

/// Errors raised while seeding demo data.
#[derive(Debug, Error)]
pub enum SeedError {
    /// A built-in account failed directory validation.
    #[error("demo account failed validation: {0}")]
    InvalidAccount(#[from] UserValidationError),
    /// A built-in password failed the password rules.
    #[error("demo password failed validation: {0}")]
    InvalidPassword(#[from] LoginValidationError),
    /// A record could not be encoded as a row.
    #[error(transparent)]
    Codec(#[from] RowCodecError),
    /// The row store failed.
    #[error("row store error while seeding: {0}")]
    Store(#[from] RowStoreError),
    /// The credential store failed.
    #[error("credential store error while seeding: {0}")]
    Credentials(#[from] AuthProviderError),
}

fn demo_user(account: &DemoAccount, now: DateTime<Utc>) -> Result<User, SeedError> {
    Ok(User {
        id: UserId::random(),
        email: EmailAddress::new(account.email)?,
        name: DisplayName::new(account.name)?,
        role: account.role,
        created_at: now,
        updated_at: now,
        revision: 1,
    })
}

fn demo_book(book: &DemoBook, now: DateTime<Utc>) -> Book {
    Book {
        id: BookId::random(),
        title: book.title.to_owned(),
        author: book.author.to_owned(),
        category: book.category,
        copies: Copies::new(book.total, Some(book.available)),
        isbn: Some(book.isbn.to_owned()),
        published_year: Some(book.published_year),
        publisher: Some(book.publisher.to_owned()),
        created_at: now,
        updated_at: now,
        revision: 1,
    }
}

/// Seed demo accounts and books unless the store already holds users.
///
/// Returns what was written; an already populated store yields an empty
/// summary.
pub async fn seed_demo_data(
    store: &dyn RowStore,
    auth: &dyn AuthProvider,
    now: DateTime<Utc>,
) -> Result<SeedSummary, SeedError> {
    if !store.select(EntityKind::User, &RowFilter::all()).await?.is_empty() {
        info!("row store already populated; skipping demo data");
        return Ok(SeedSummary::default());
    }

    let mut summary = SeedSummary::default();
    for account in &DEMO_ACCOUNTS {
        let user = demo_user(account, now)?;
        let password = Password::new(account.password)?;
        store
            .insert(EntityKind::User, codec::encode(&Record::User(user.clone()))?)
            .await?;
        auth.set_password(&user.email, &password).await?;
        summary.users = summary.users.saturating_add(1);
    }
    for book in &DEMO_BOOKS {
        let record = Record::Book(demo_book(book, now));
        store.insert(EntityKind::Book, codec::encode(&record)?).await?;
        summary.books = summary.books.saturating_add(1);
    }
    info!(users = summary.users, books = summary.books, "demo data seeded");
    Ok(summary)
}
