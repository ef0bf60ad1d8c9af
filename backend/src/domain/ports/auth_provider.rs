//! Driven port for the credential store behind sign-in.

use async_trait::async_trait;

use crate::domain::{EmailAddress, LoginCredentials, Password};

use super::define_port_error;

define_port_error! {
    /// Errors raised by authentication provider adapters.
    pub enum AuthProviderError {
        /// Email/password pair did not match.
        InvalidCredentials => "invalid email or password",
        /// No credentials are registered for the email.
        UnknownAccount { email: String } => "no credentials registered for {email}",
        /// The provider could not be reached.
        Unavailable { message: String } => "authentication provider unavailable: {message}",
    }
}

/// Port for verifying and maintaining account credentials.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Verify credentials and return the account's email.
    async fn authenticate(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<EmailAddress, AuthProviderError>;

    /// Register or replace the password for `email`.
    async fn set_password(
        &self,
        email: &EmailAddress,
        password: &Password,
    ) -> Result<(), AuthProviderError>;

    /// Move credentials to a new email address.
    async fn rename(&self, from: &EmailAddress, to: &EmailAddress) -> Result<(), AuthProviderError>;

    /// Drop the credentials for `email`; unknown emails are ignored.
    async fn forget(&self, email: &EmailAddress) -> Result<(), AuthProviderError>;
}
