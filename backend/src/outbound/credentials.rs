//! In-memory `AuthProvider` adapter.
//!
//! Keeps one salted SHA-256 digest per email. Plain passwords never leave the
//! [`Password`] wrapper except to be hashed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::ports::{AuthProvider, AuthProviderError};
use crate::domain::{EmailAddress, LoginCredentials, Password};

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredCredential {
    salt: String,
    digest: String,
}

impl StoredCredential {
    fn derive(secret: &str) -> Self {
        let salt = Uuid::new_v4().simple().to_string();
        let digest = digest(&salt, secret);
        Self { salt, digest }
    }

    fn verify(&self, secret: &str) -> bool {
        digest(&self.salt, secret) == self.digest
    }
}

fn digest(salt: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Credential store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryAuthProvider {
    credentials: Mutex<HashMap<EmailAddress, StoredCredential>>,
}

impl InMemoryAuthProvider {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<EmailAddress, StoredCredential>>, AuthProviderError> {
        self.credentials
            .lock()
            .map_err(|_| AuthProviderError::unavailable("credential store lock poisoned"))
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn authenticate(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<EmailAddress, AuthProviderError> {
        // Malformed emails cannot have been registered.
        let email = EmailAddress::new(credentials.email())
            .map_err(|_| AuthProviderError::invalid_credentials())?;
        let store = self.lock()?;
        match store.get(&email) {
            Some(stored) if stored.verify(credentials.password()) => Ok(email),
            _ => Err(AuthProviderError::invalid_credentials()),
        }
    }

    async fn set_password(
        &self,
        email: &EmailAddress,
        password: &Password,
    ) -> Result<(), AuthProviderError> {
        let credential = StoredCredential::derive(password.expose());
        self.lock()?.insert(email.clone(), credential);
        Ok(())
    }

    async fn rename(&self, from: &EmailAddress, to: &EmailAddress) -> Result<(), AuthProviderError> {
        let mut store = self.lock()?;
        let credential = store
            .remove(from)
            .ok_or_else(|| AuthProviderError::unknown_account(from.as_str()))?;
        store.insert(to.clone(), credential);
        Ok(())
    }

    async fn forget(&self, email: &EmailAddress) -> Result<(), AuthProviderError> {
        self.lock()?.remove(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::{fixture, rstest};

    fn email(raw: &str) -> EmailAddress {
        EmailAddress::new(raw).expect("valid email")
    }

    fn creds(email: &str, password: &str) -> LoginCredentials {
        LoginCredentials::try_from_parts(email, password).expect("credentials")
    }

    #[fixture]
    async fn provider() -> InMemoryAuthProvider {
        let provider = InMemoryAuthProvider::new();
        provider
            .set_password(
                &email("admin@library.com"),
                &Password::new("admin123").expect("password"),
            )
            .await
            .expect("registered");
        provider
    }

    #[rstest]
    #[tokio::test]
    async fn accepts_matching_password(#[future] provider: InMemoryAuthProvider) {
        let provider = provider.await;
        let signed_in = provider
            .authenticate(&creds("Admin@Library.com", "admin123"))
            .await
            .expect("authenticated");
        assert_eq!(signed_in.as_str(), "admin@library.com");
    }

    #[rstest]
    #[case("admin@library.com", "admin124")]
    #[case("nobody@library.com", "admin123")]
    #[case("not-an-email", "admin123")]
    #[tokio::test]
    async fn rejects_everything_else(
        #[future] provider: InMemoryAuthProvider,
        #[case] user: &str,
        #[case] password: &str,
    ) {
        let provider = provider.await;
        let err = provider
            .authenticate(&creds(user, password))
            .await
            .expect_err("rejected");
        assert_eq!(err, AuthProviderError::invalid_credentials());
    }

    #[rstest]
    #[tokio::test]
    async fn rename_moves_credentials(#[future] provider: InMemoryAuthProvider) {
        let provider = provider.await;
        provider
            .rename(&email("admin@library.com"), &email("head@library.com"))
            .await
            .expect("renamed");
        assert!(provider.authenticate(&creds("head@library.com", "admin123")).await.is_ok());
        assert!(provider.authenticate(&creds("admin@library.com", "admin123")).await.is_err());

        let err = provider
            .rename(&email("ghost@library.com"), &email("x@library.com"))
            .await
            .expect_err("unknown");
        assert!(matches!(err, AuthProviderError::UnknownAccount { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn salts_differ_per_registration() {
        let first = StoredCredential::derive("librarian123");
        let second = StoredCredential::derive("librarian123");
        assert_ne!(first.digest, second.digest);
        assert!(first.verify("librarian123"));
        assert!(!first.verify("librarian124"));
    }

    #[rstest]
    #[tokio::test]
    async fn forget_is_idempotent(#[future] provider: InMemoryAuthProvider) {
        let provider = provider.await;
        let admin = email("admin@library.com");
        provider.forget(&admin).await.expect("forgotten");
        provider.forget(&admin).await.expect("still fine");
        assert!(provider.authenticate(&creds("admin@library.com", "admin123")).await.is_err());
    }
}
