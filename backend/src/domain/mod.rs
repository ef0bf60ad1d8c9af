//! Domain primitives, stores and use-cases.
//!
//! Purpose: hold the catalogue, directory and ledger behind one lock and
//! expose the library's use-cases through the driving ports in [`ports`].
//! Nothing here knows about HTTP, WebSockets or the row store; adapters plug
//! in at the ports.
//!
//! Public surface:
//! - [`Error`] and [`ErrorCode`]: transport-agnostic error payload.
//! - [`LibraryService`]: stores plus catalogue, circulation and report
//!   use-cases.
//! - [`AccountService`]: sign-in and account administration over an
//!   [`ports::AuthProvider`].
//! - [`query`]: pure search, grouping and aggregate helpers.

pub mod error;
pub mod ports;
pub mod query;

mod accounts;
mod auth;
mod book;
mod catalog;
mod changes;
mod circulation;
mod directory;
mod fine_policy;
mod ids;
mod ingestion;
mod library;
mod library_error;
mod library_service;
mod money;
mod trace_id;
mod transaction;
mod user;

pub use self::accounts::AccountService;
pub use self::auth::{LoginCredentials, LoginValidationError, PASSWORD_MIN_LENGTH, Password};
pub use self::book::{
    Book, BookCategory, BookDraft, BookPatch, CategoryColor, Copies, UnknownCategory,
};
pub use self::catalog::Catalog;
pub use self::changes::{ChangeEvent, ChangeOperation, EntityKind, Record};
pub use self::circulation::{BorrowOutcome, BorrowRequest, Ledger, ReturnOutcome};
pub use self::directory::Directory;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
#[cfg(test)]
pub use self::fine_policy::MockFinePolicy;
pub use self::fine_policy::{FinePolicy, FlatDailyFine};
pub use self::ids::{BookId, TransactionId, UserId};
pub use self::ingestion::run_apply_loop;
pub use self::library::{ApplyOutcome, LibraryState};
pub use self::library_error::LibraryError;
pub use self::library_service::{CHANGE_FEED_CAPACITY, CirculationRules, LibraryService};
pub use self::money::{Money, MoneyParseError};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::transaction::{Transaction, TransactionStatus};
pub use self::user::{
    Actor, DisplayName, EmailAddress, Role, Section, User, UserDraft, UserPatch,
    UserValidationError,
};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use library_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("librarians only"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
