//! Directory accounts, roles and the capability check guarding protected
//! operations.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Error, UserId};

/// Validation errors for directory fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    /// Email does not look like `local@domain.tld`.
    InvalidEmail,
    /// Display name is blank once trimmed.
    EmptyName,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEmail => write!(f, "email must be a valid address"),
            Self::EmptyName => write!(f, "name must not be empty"),
        }
    }
}

impl std::error::Error for UserValidationError {}

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// Lower-cased, format-checked email address.
///
/// # Examples
/// ```
/// use library_backend::domain::EmailAddress;
///
/// let email = EmailAddress::new(" Admin@Library.com ").expect("valid address");
/// assert_eq!(email.as_str(), "admin@library.com");
/// assert!(EmailAddress::new("not-an-email").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validate and normalise an address.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let normalised = raw.as_ref().trim().to_lowercase();
        if !email_regex().is_match(&normalised) {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(normalised))
    }

    /// Address as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Display name shown in listings and on transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Trim and validate a display name.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyName);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Name as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Staff role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including user management.
    Admin,
    /// Day-to-day catalogue and circulation work.
    Librarian,
}

impl Role {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Librarian => "librarian",
        }
    }

    /// Whether this role covers everything `required` may do.
    #[must_use]
    pub const fn satisfies(self, required: Self) -> bool {
        matches!((self, required), (Self::Admin, _) | (Self::Librarian, Self::Librarian))
    }

    /// Capability check for protected operations.
    ///
    /// # Examples
    /// ```
    /// use library_backend::domain::{ErrorCode, Role};
    ///
    /// assert!(Role::Admin.require(Role::Librarian).is_ok());
    /// let err = Role::Librarian.require(Role::Admin).expect_err("librarians are not admins");
    /// assert_eq!(err.code(), ErrorCode::Forbidden);
    /// ```
    pub fn require(self, required: Self) -> Result<(), Error> {
        if self.satisfies(required) {
            Ok(())
        } else {
            Err(Error::forbidden(format!(
                "the {} role is required for this operation",
                required.as_str()
            )))
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Console areas a signed-in user may open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Counters and overdue list.
    Dashboard,
    /// Catalogue.
    Books,
    /// Circulation history.
    Transactions,
    /// Report series.
    Reports,
    /// Account management.
    Users,
    /// Console settings.
    Settings,
}

impl Section {
    /// Every section in navigation order.
    pub const ALL: [Self; 6] = [
        Self::Dashboard,
        Self::Books,
        Self::Transactions,
        Self::Reports,
        Self::Users,
        Self::Settings,
    ];

    /// Least privileged role allowed to open the section.
    #[must_use]
    pub const fn required_role(self) -> Role {
        match self {
            Self::Users | Self::Settings => Role::Admin,
            Self::Dashboard | Self::Books | Self::Transactions | Self::Reports => Role::Librarian,
        }
    }

    /// Sections visible to `role`.
    pub fn visible_to(role: Role) -> impl Iterator<Item = Self> {
        Self::ALL
            .into_iter()
            .filter(move |section| role.satisfies(section.required_role()))
    }
}

/// Directory account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Stable identifier.
    pub id: UserId,
    /// Unique, lower-cased email.
    pub email: EmailAddress,
    /// Display name.
    pub name: DisplayName,
    /// Role.
    pub role: Role,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
    /// Monotonic mutation counter.
    pub revision: u64,
}

/// Fields accepted when adding a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    /// Raw email, validated on insert.
    pub email: String,
    /// Raw display name.
    pub name: String,
    /// Role.
    pub role: Role,
}

/// Partial update of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    /// New email.
    pub email: Option<String>,
    /// New display name.
    pub name: Option<String>,
    /// New role.
    pub role: Option<Role>,
}

/// Signed-in staff member on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Directory id.
    pub user_id: UserId,
    /// Display name at sign-in time.
    pub name: String,
    /// Role at sign-in time.
    pub role: Role,
}

impl Actor {
    /// Capability check against the actor's role.
    pub fn require(&self, required: Role) -> Result<(), Error> {
        self.role.require(required)
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            name: user.name.to_string(),
            role: user.role,
        }
    }
}
