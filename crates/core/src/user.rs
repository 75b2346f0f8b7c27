//! User accounts.
//!
//! Accounts are created and deleted, never edited: there is deliberately no operation that
//! changes an existing user's role. To move someone to a different role, delete the account
//! and create a new one.

use crate::access::Role;
use crate::auth::PasswordHash;
use crate::config::BootstrapAdmin;
use crate::store::Store;
use crate::validation::required_text;
use crate::{SimrsError, SimrsResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use simrs_types::{NonEmptyText, RecordId};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub username: NonEmptyText,
    pub password_hash: PasswordHash,
    pub name: NonEmptyText,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Account creation form input.
#[derive(Clone, Debug, Default)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub role: String,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// Returns `SimrsError::Validation` if any field is blank, the role is unknown or the
    /// username is already taken.
    pub fn create(&self, input: NewUser) -> SimrsResult<User> {
        if [&input.username, &input.password, &input.name, &input.role]
            .iter()
            .any(|v| v.trim().is_empty())
        {
            return Err(SimrsError::Validation("all fields are required".into()));
        }

        let username = required_text("username", &input.username)?;
        let role: Role = input
            .role
            .parse()
            .map_err(|e: crate::access::UnknownName| SimrsError::Validation(e.to_string()))?;

        if self.store.user_by_username(username.as_str())?.is_some() {
            return Err(SimrsError::Validation("username already taken".into()));
        }

        let name = required_text("name", &input.name)?;
        let user = User {
            id: RecordId::new(),
            username,
            password_hash: PasswordHash::create(&input.password)?,
            name,
            role,
            created_at: Utc::now(),
        };

        let user = self.store.insert_user(user)?;
        tracing::info!("created user {} with role {}", user.username, user.role);
        Ok(user)
    }

    /// All accounts, newest first.
    pub fn list(&self) -> SimrsResult<Vec<User>> {
        let mut users = self.store.users()?;
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    /// Deletes an account.
    ///
    /// # Errors
    ///
    /// Returns `SimrsError::NotFound` if no account has that id.
    pub fn delete(&self, id: RecordId) -> SimrsResult<()> {
        if !self.store.delete_user(id)? {
            return Err(SimrsError::not_found("user", id));
        }
        tracing::info!("deleted user {}", id);
        Ok(())
    }

    /// Returns the account whose credentials match.
    ///
    /// # Errors
    ///
    /// Returns `SimrsError::BadCredentials` for an unknown username or wrong password.
    pub fn authenticate(&self, username: &str, password: &str) -> SimrsResult<User> {
        let user = self
            .store
            .user_by_username(username.trim())?
            .filter(|u| u.password_hash.verify(password));

        user.ok_or_else(|| {
            tracing::warn!("failed login for username {:?}", username.trim());
            SimrsError::BadCredentials
        })
    }

    /// Creates the configured super_admin if there are no accounts at all.
    ///
    /// Returns the created account, or `None` if accounts already existed.
    pub fn ensure_bootstrap_admin(&self, admin: &BootstrapAdmin) -> SimrsResult<Option<User>> {
        if !self.store.users()?.is_empty() {
            return Ok(None);
        }
        let user = self.create(NewUser {
            username: admin.username.clone(),
            password: admin.password.clone(),
            name: "Super Admin".into(),
            role: Role::SuperAdmin.as_str().into(),
        })?;
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TableStore;

    fn service() -> UserService {
        UserService::new(Arc::new(TableStore::in_memory()))
    }

    fn kasir() -> NewUser {
        NewUser {
            username: "kasir".into(),
            password: "123".into(),
            name: "Staff Billing".into(),
            role: "kasir".into(),
        }
    }

    #[test]
    fn every_field_is_required() {
        let svc = service();
        for blank in 0..4 {
            let mut input = kasir();
            match blank {
                0 => input.username.clear(),
                1 => input.password.clear(),
                2 => input.name = "  ".into(),
                _ => input.role.clear(),
            }
            let err = svc.create(input).unwrap_err();
            assert_eq!(err.to_string(), "all fields are required");
        }
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let svc = service();
        svc.create(kasir()).unwrap();
        let err = svc.create(kasir()).unwrap_err();
        assert_eq!(err.to_string(), "username already taken");
        assert_eq!(svc.list().unwrap().len(), 1);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = service()
            .create(NewUser {
                role: "perawat".into(),
                ..kasir()
            })
            .unwrap_err();
        assert!(matches!(err, SimrsError::Validation(_)));
    }

    #[test]
    fn password_is_stored_hashed() {
        let user = service().create(kasir()).unwrap();
        assert!(user.password_hash.verify("123"));
        let stored = serde_yaml::to_string(&user).unwrap();
        assert!(stored.contains("$argon2id$"));
        assert!(!stored.contains("password_hash: '123'"));
    }

    #[test]
    fn delete_then_recreate_is_the_only_way_to_change_role() {
        let svc = service();
        let user = svc.create(kasir()).unwrap();
        svc.delete(user.id).unwrap();
        assert!(matches!(
            svc.delete(user.id).unwrap_err(),
            SimrsError::NotFound { .. }
        ));

        let recreated = svc
            .create(NewUser {
                role: "manajemen".into(),
                ..kasir()
            })
            .unwrap();
        assert_eq!(recreated.role, Role::Manajemen);
        assert_ne!(recreated.id, user.id);
    }

    #[test]
    fn bootstrap_admin_only_on_empty_table() {
        let svc = service();
        let admin = BootstrapAdmin {
            username: "root".into(),
            password: "s3cret".into(),
        };
        let created = svc.ensure_bootstrap_admin(&admin).unwrap().unwrap();
        assert_eq!(created.role, Role::SuperAdmin);
        assert!(svc.ensure_bootstrap_admin(&admin).unwrap().is_none());
        assert!(svc.authenticate("root", "s3cret").is_ok());
    }
}
