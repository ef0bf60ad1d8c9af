//! Driving port for sign-in and session resolution.
//!
//! Inbound adapters authenticate credentials and turn a stored session user
//! id back into an [`Actor`] without knowing the credential store or the
//! directory behind it.

use async_trait::async_trait;

use crate::domain::{Actor, Error, LoginCredentials, User, UserId};

/// Domain use-case port for authentication.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginService: Send + Sync {
    /// Validate credentials and return the matching directory user.
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<User, Error>;

    /// Resolve a session's user id to the acting staff member.
    ///
    /// Fails with `Unauthorized` once the account has been removed.
    async fn resolve_actor(&self, user_id: &UserId) -> Result<Actor, Error>;
}
