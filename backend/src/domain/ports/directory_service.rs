//! Driving port for account management.

use async_trait::async_trait;

use crate::domain::{Actor, Error, Password, User, UserDraft, UserId, UserPatch};

/// Domain use-case port for listing and administering staff accounts.
///
/// Listing is open to every signed-in role; mutations require an admin.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Users matching `term`, ordered by name.
    async fn list_users(&self, actor: &Actor, term: &str) -> Result<Vec<User>, Error>;

    /// One user.
    async fn get_user(&self, actor: &Actor, id: &UserId) -> Result<User, Error>;

    /// Create an account with its initial password.
    async fn add_user(&self, actor: &Actor, draft: UserDraft, password: Password)
    -> Result<User, Error>;

    /// Edit an account, optionally replacing its password.
    async fn update_user(
        &self,
        actor: &Actor,
        id: &UserId,
        patch: UserPatch,
        password: Option<Password>,
    ) -> Result<User, Error>;

    /// Remove an account and its credentials.
    async fn remove_user(&self, actor: &Actor, id: &UserId) -> Result<User, Error>;
}
