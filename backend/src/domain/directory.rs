//! Directory store: staff accounts and role assignments.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{
    DisplayName, EmailAddress, EntityKind, Ledger, LibraryError, Role, User, UserDraft, UserId,
    UserPatch,
};

/// In-memory directory.
///
/// ## Invariants
/// - emails are unique.
/// - once an admin exists, the last one can be neither removed nor demoted.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    users: BTreeMap<UserId, User>,
}

fn parse_email(raw: &str) -> Result<EmailAddress, LibraryError> {
    EmailAddress::new(raw).map_err(|err| LibraryError::validation("email", err.to_string()))
}

fn parse_name(raw: &str) -> Result<DisplayName, LibraryError> {
    DisplayName::new(raw).map_err(|err| LibraryError::validation("name", err.to_string()))
}

impl Directory {
    /// Look up a user.
    #[must_use]
    pub fn get(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    /// Look up a user by email, ignoring case.
    #[must_use]
    pub fn find_by_email(&self, email: &str) -> Option<&User> {
        let needle = email.trim().to_lowercase();
        self.users.values().find(|user| user.email.as_str() == needle)
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the directory holds no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Lazily yield the users matching `predicate`.
    pub fn find_users<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a User> + 'a
    where
        P: Fn(&User) -> bool + 'a,
    {
        self.users.values().filter(move |user| predicate(user))
    }

    fn admin_count(&self) -> usize {
        self.users.values().filter(|user| user.role == Role::Admin).count()
    }

    fn ensure_email_free(&self, email: &EmailAddress, owner: Option<&UserId>) -> Result<(), LibraryError> {
        let taken = self
            .users
            .values()
            .any(|user| &user.email == email && Some(&user.id) != owner);
        if taken {
            return Err(LibraryError::conflict(format!(
                "email {email} is already registered"
            )));
        }
        Ok(())
    }

    fn ensure_not_last_admin(&self, user: &User, action: &str) -> Result<(), LibraryError> {
        if user.role == Role::Admin && self.admin_count() <= 1 {
            return Err(LibraryError::conflict(format!(
                "cannot {action} the last admin account"
            )));
        }
        Ok(())
    }

    /// Validate and insert a new account.
    pub fn add_user(&mut self, draft: UserDraft, now: DateTime<Utc>) -> Result<User, LibraryError> {
        let email = parse_email(&draft.email)?;
        let name = parse_name(&draft.name)?;
        self.ensure_email_free(&email, None)?;

        let user = User {
            id: UserId::random(),
            email,
            name,
            role: draft.role,
            created_at: now,
            updated_at: now,
            revision: 1,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Merge `patch` into an existing account.
    pub fn update_user(
        &mut self,
        id: &UserId,
        patch: UserPatch,
        now: DateTime<Utc>,
    ) -> Result<User, LibraryError> {
        let current = self
            .users
            .get(id)
            .ok_or_else(|| LibraryError::not_found(EntityKind::User, id))?;

        let mut next = current.clone();
        if let Some(email) = patch.email.as_deref() {
            let email = parse_email(email)?;
            self.ensure_email_free(&email, Some(id))?;
            next.email = email;
        }
        if let Some(name) = patch.name.as_deref() {
            next.name = parse_name(name)?;
        }
        if let Some(role) = patch.role {
            if role != Role::Admin {
                self.ensure_not_last_admin(current, "demote")?;
            }
            next.role = role;
        }
        next.updated_at = now;
        next.revision = current.revision.saturating_add(1);

        self.users.insert(next.id, next.clone());
        Ok(next)
    }

    /// Remove an account without open loans, keeping at least one admin.
    pub fn remove_user(&mut self, id: &UserId, ledger: &Ledger) -> Result<User, LibraryError> {
        let user = self
            .users
            .get(id)
            .ok_or_else(|| LibraryError::not_found(EntityKind::User, id))?;
        let open = ledger.open_loans_for_user(id);
        if open > 0 {
            return Err(LibraryError::conflict(format!(
                "user {id} has {open} open loan(s) and cannot be removed"
            )));
        }
        self.ensure_not_last_admin(user, "remove")?;
        self.users
            .remove(id)
            .ok_or_else(|| LibraryError::not_found(EntityKind::User, id))
    }

    /// Store a row received from outside, keeping the newest revision.
    pub(crate) fn merge(&mut self, user: User) -> bool {
        match self.users.get(&user.id) {
            Some(existing) if existing.revision >= user.revision => false,
            _ => {
                self.users.insert(user.id, user);
                true
            }
        }
    }

    /// Drop a row deleted outside; returns whether it was present.
    pub(crate) fn forget(&mut self, id: &UserId) -> bool {
        self.users.remove(id).is_some()
    }
}
