//! Wire views of catalogue, directory and ledger records.
//!
//! Shared by the REST handlers and the change stream so a record looks the
//! same whichever way a client receives it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{Book, CategoryColor, Role, Section, Transaction, TransactionStatus, User};

/// Catalogue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookDto {
    pub id: Uuid,
    #[schema(example = "Quantum Physics Explained")]
    pub title: String,
    #[schema(example = "Maria Garcia")]
    pub author: String,
    /// Category label, e.g. `Human Science`.
    #[schema(example = "Physics")]
    pub category: String,
    #[schema(value_type = String, example = "yellow")]
    pub category_color: CategoryColor,
    pub total_copies: u32,
    pub available_copies: u32,
    pub isbn: Option<String>,
    pub published_year: Option<i32>,
    pub publisher: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Book> for BookDto {
    fn from(book: &Book) -> Self {
        Self {
            id: *book.id.as_uuid(),
            title: book.title.clone(),
            author: book.author.clone(),
            category: book.category.label().to_owned(),
            category_color: book.category.color(),
            total_copies: book.copies.total(),
            available_copies: book.copies.available(),
            isbn: book.isbn.clone(),
            published_year: book.published_year,
            publisher: book.publisher.clone(),
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

/// Directory account. Credentials never leave the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    #[schema(example = "librarian@library.com")]
    pub email: String,
    #[schema(example = "Librarian User")]
    pub name: String,
    #[schema(value_type = String, example = "librarian")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: *user.id.as_uuid(),
            email: user.email.as_str().to_owned(),
            name: user.name.as_str().to_owned(),
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Signed-in account plus the console sections its role may open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserDto {
    #[serde(flatten)]
    pub user: UserDto,
    #[schema(value_type = Vec<String>, example = json!(["dashboard", "books", "transactions", "reports"]))]
    pub sections: Vec<Section>,
}

impl From<&User> for CurrentUserDto {
    fn from(user: &User) -> Self {
        Self {
            user: UserDto::from(user),
            sections: Section::visible_to(user.role).collect(),
        }
    }
}

/// Loan record. `fine` is a two-decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "Sarah Johnson")]
    pub user_name: String,
    pub book_id: Uuid,
    #[schema(example = "Advanced Calculus")]
    pub book_title: String,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    #[schema(value_type = String, example = "overdue")]
    pub status: TransactionStatus,
    #[schema(value_type = String, example = "6.00")]
    pub fine: String,
    pub recorded_by: Option<Uuid>,
    pub closed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionDto {
    fn from(transaction: &Transaction) -> Self {
        Self {
            id: *transaction.id.as_uuid(),
            user_id: *transaction.user_id.as_uuid(),
            user_name: transaction.user_name.clone(),
            book_id: *transaction.book_id.as_uuid(),
            book_title: transaction.book_title.clone(),
            borrow_date: transaction.borrow_date,
            due_date: transaction.due_date,
            return_date: transaction.return_date,
            status: transaction.status,
            fine: transaction.fine.to_string(),
            recorded_by: transaction.recorded_by.map(|id| *id.as_uuid()),
            closed_by: transaction.closed_by.map(|id| *id.as_uuid()),
            created_at: transaction.created_at,
            updated_at: transaction.updated_at,
        }
    }
}

/// Map a slice of records to their wire views.
pub(crate) fn views<'a, T: 'a, D: From<&'a T>>(records: &'a [T]) -> Vec<D> {
    records.iter().map(D::from).collect()
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{BookCategory, BookId, Copies, DisplayName, EmailAddress, UserId};
    use chrono::TimeZone;
    use rstest::rstest;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 5, 1, 9, 0, 0)
            .single()
            .expect("valid instant")
    }

    #[rstest]
    fn books_carry_label_and_colour() {
        let book = Book {
            id: BookId::random(),
            title: "Introduction to Human Biology".into(),
            author: "Jane Smith".into(),
            category: BookCategory::HumanScience,
            copies: Copies::new(5, Some(3)),
            isbn: None,
            published_year: Some(2020),
            publisher: None,
            created_at: instant(),
            updated_at: instant(),
            revision: 1,
        };
        let json = serde_json::to_value(BookDto::from(&book)).expect("serialises");
        assert_eq!(json["category"], "Human Science");
        assert_eq!(json["categoryColor"], "green");
        assert_eq!(json["availableCopies"], 3);
        assert_eq!(json["publishedYear"], 2020);
    }

    #[rstest]
    #[case(Role::Admin, 6)]
    #[case(Role::Librarian, 4)]
    fn current_user_lists_visible_sections(#[case] role: Role, #[case] expected: usize) {
        let user = User {
            id: UserId::random(),
            email: EmailAddress::new("admin@library.com").expect("email"),
            name: DisplayName::new("Admin User").expect("name"),
            role,
            created_at: instant(),
            updated_at: instant(),
            revision: 1,
        };
        let json = serde_json::to_value(CurrentUserDto::from(&user)).expect("serialises");
        assert_eq!(json["email"], "admin@library.com");
        assert_eq!(json["sections"].as_array().map(Vec::len), Some(expected));
    }
}
