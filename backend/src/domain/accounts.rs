//! Account service: the directory plus the credential store behind it.
//!
//! Implements sign-in and account administration. Directory rules run first
//! under the library lock; credential calls follow once the lock is released.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::ports::{AuthProvider, AuthProviderError, DirectoryService, LoginService};
use crate::domain::{
    Actor, Error, LibraryService, LoginCredentials, Password, User, UserDraft, UserId, UserPatch,
};

/// Account use-cases over the library directory and an [`AuthProvider`].
#[derive(Clone)]
pub struct AccountService {
    library: Arc<LibraryService>,
    auth: Arc<dyn AuthProvider>,
}

impl AccountService {
    /// Combine the library with a credential store.
    pub fn new(library: Arc<LibraryService>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { library, auth }
    }
}

impl AccountService {
    /// Move credentials to the edited email and apply a new password.
    ///
    /// A rename is undone when the password change that follows it fails.
    async fn sync_credentials(
        &self,
        before: &User,
        after: &User,
        password: Option<&Password>,
    ) -> Result<(), AuthProviderError> {
        let renamed = before.email != after.email;
        if renamed {
            self.auth.rename(&before.email, &after.email).await?;
        }
        let Some(password) = password else {
            return Ok(());
        };
        if let Err(error) = self.auth.set_password(&after.email, password).await {
            if renamed {
                if let Err(undo) = self.auth.rename(&after.email, &before.email).await {
                    warn!(user_id = %after.id, error = %undo, "credentials stranded under the new email");
                }
            }
            return Err(error);
        }
        Ok(())
    }
}

fn map_auth_error(error: AuthProviderError) -> Error {
    match error {
        AuthProviderError::InvalidCredentials | AuthProviderError::UnknownAccount { .. } => {
            Error::unauthorized("invalid email or password")
        }
        AuthProviderError::Unavailable { message } => {
            Error::service_unavailable(format!("authentication provider unavailable: {message}"))
        }
    }
}

#[async_trait]
impl LoginService for AccountService {
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<User, Error> {
        let email = self
            .auth
            .authenticate(credentials)
            .await
            .map_err(map_auth_error)?;
        match self.library.find_by_email(email.as_str())? {
            Some(user) => Ok(user),
            None => {
                warn!(email = %email, "credentials accepted for an email missing from the directory");
                Err(Error::unauthorized("invalid email or password"))
            }
        }
    }

    async fn resolve_actor(&self, user_id: &UserId) -> Result<Actor, Error> {
        self.library
            .user(user_id)?
            .map(|user| Actor::from(&user))
            .ok_or_else(|| Error::unauthorized("session user no longer exists"))
    }
}

#[async_trait]
impl DirectoryService for AccountService {
    async fn list_users(&self, actor: &Actor, term: &str) -> Result<Vec<User>, Error> {
        self.library.list_users(actor, term)
    }

    async fn get_user(&self, actor: &Actor, id: &UserId) -> Result<User, Error> {
        self.library.get_user(actor, id)
    }

    async fn add_user(
        &self,
        actor: &Actor,
        draft: UserDraft,
        password: Password,
    ) -> Result<User, Error> {
        let user = self.library.add_user(actor, draft)?;
        if let Err(error) = self.auth.set_password(&user.email, &password).await {
            // Without credentials the account is unusable; take it back out.
            if let Err(rollback) = self.library.discard_user(&user.id) {
                warn!(user_id = %user.id, error = %rollback, "failed to roll back account creation");
            }
            return Err(map_auth_error(error));
        }
        Ok(user)
    }

    async fn update_user(
        &self,
        actor: &Actor,
        id: &UserId,
        patch: UserPatch,
        password: Option<Password>,
    ) -> Result<User, Error> {
        let before = self.library.get_user(actor, id)?;
        let after = self.library.update_user(actor, id, patch)?;
        if let Err(error) = self.sync_credentials(&before, &after, password.as_ref()).await {
            if let Err(rollback) = self.library.restore_user(&before) {
                warn!(user_id = %before.id, error = %rollback, "failed to roll back account edit");
            }
            return Err(map_auth_error(error));
        }
        Ok(after)
    }

    async fn remove_user(&self, actor: &Actor, id: &UserId) -> Result<User, Error> {
        let removed = self.library.remove_user(actor, id)?;
        if let Err(error) = self.auth.forget(&removed.email).await {
            warn!(user_id = %removed.id, %error, "credentials left behind for removed account");
        }
        Ok(removed)
    }
}
