//! Credentials and sessions.
//!
//! Passwords are stored as Argon2 PHC strings. A failed login always yields the same
//! [`SimrsError::BadCredentials`], whichever half of the pair was wrong.
//!
//! A [`Session`] is the explicit per-request context: it is created by [`SessionRegistry::login`],
//! restored from its bearer token by [`SessionRegistry::restore`] and torn down by
//! [`SessionRegistry::logout`]. Handlers receive it as a value; there is no ambient "current
//! user".

use crate::access::{authorize, authorize_operation, Access, Operation, Page, Role};
use crate::constants::SESSION_TOKEN_LEN;
use crate::user::{User, UserService};
use crate::{SimrsError, SimrsResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, PasswordVerifier,
};
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use simrs_types::RecordId;
use std::collections::HashMap;
use std::sync::RwLock;

/// Argon2 password hash as persisted in the users table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes `password` with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns `SimrsError::PasswordHashing` if Argon2 rejects the input.
    pub fn create(password: &str) -> SimrsResult<Self> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| Self(hash.to_string()))
            .map_err(|e| SimrsError::PasswordHashing(e.to_string()))
    }

    /// Returns true if `password` matches. A stored value that is not a valid PHC string
    /// never matches.
    pub fn verify(&self, password: &str) -> bool {
        let Ok(parsed) = argon2::PasswordHash::new(&self.0) else {
            tracing::warn!("stored password hash is not a PHC string");
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The account a session acts for. Never carries the credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: RecordId,
    pub username: String,
    pub name: String,
    pub role: Role,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.to_string(),
            name: user.name.to_string(),
            role: user.role,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
    pub issued_at: DateTime<Utc>,
}

impl Session {
    pub fn role(&self) -> Role {
        self.user.role
    }

    /// Checks the capability table for `operation`.
    ///
    /// # Errors
    ///
    /// Returns `SimrsError::Forbidden` carrying the role's default page.
    pub fn require(&self, operation: Operation) -> SimrsResult<()> {
        match authorize_operation(self.role(), operation) {
            Access::Allow => Ok(()),
            Access::Redirect(redirect) => {
                tracing::warn!(
                    "{} ({}) denied {:?}",
                    self.user.username,
                    self.role(),
                    operation
                );
                Err(SimrsError::Forbidden {
                    role: self.role(),
                    page: operation.home_page(),
                    redirect,
                })
            }
        }
    }

    pub fn authorize_page(&self, page: Page) -> Access {
        authorize(self.role(), page)
    }
}

/// In-process registry of live sessions keyed by bearer token.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifies credentials and opens a session.
    ///
    /// # Errors
    ///
    /// Returns `SimrsError::BadCredentials` for any unknown username or wrong password.
    pub fn login(
        &self,
        users: &UserService,
        username: &str,
        password: &str,
    ) -> SimrsResult<Session> {
        let user = users.authenticate(username, password)?;
        let session = Session {
            token: new_token(),
            user: SessionUser::from(&user),
            issued_at: Utc::now(),
        };

        self.sessions
            .write()
            .map_err(|_| SimrsError::StoreLock)?
            .insert(session.token.clone(), session.clone());

        tracing::info!("{} logged in as {}", session.user.username, session.role());
        Ok(session)
    }

    /// Looks up the session for a persisted token.
    ///
    /// # Errors
    ///
    /// Returns `SimrsError::SessionRequired` if the token is unknown or was logged out.
    pub fn restore(&self, token: &str) -> SimrsResult<Session> {
        self.sessions
            .read()
            .map_err(|_| SimrsError::StoreLock)?
            .get(token)
            .cloned()
            .ok_or(SimrsError::SessionRequired)
    }

    /// Ends the session for `token`. Returns `false` if there was none.
    pub fn logout(&self, token: &str) -> SimrsResult<bool> {
        let removed = self
            .sessions
            .write()
            .map_err(|_| SimrsError::StoreLock)?
            .remove(token);
        if let Some(session) = &removed {
            tracing::info!("{} logged out", session.user.username);
        }
        Ok(removed.is_some())
    }

    /// Ends every session held by `user_id`, e.g. after the account is deleted.
    pub fn revoke_user(&self, user_id: RecordId) -> SimrsResult<usize> {
        let mut sessions = self.sessions.write().map_err(|_| SimrsError::StoreLock)?;
        let before = sessions.len();
        sessions.retain(|_, s| s.user.id != user_id);
        Ok(before - sessions.len())
    }
}

fn new_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TableStore;
    use crate::user::NewUser;
    use std::sync::Arc;

    fn users_with(username: &str, password: &str, role: Role) -> UserService {
        let users = UserService::new(Arc::new(TableStore::in_memory()));
        users
            .create(NewUser {
                username: username.into(),
                password: password.into(),
                name: "Test User".into(),
                role: role.as_str().into(),
            })
            .unwrap();
        users
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = PasswordHash::create("123").unwrap();
        assert!(hash.as_str().starts_with("$argon2id$"));
        assert!(!hash.as_str().contains("123$"));
        assert!(hash.verify("123"));
        assert!(!hash.verify("1234"));
        assert!(!hash.verify(""));
        assert_ne!(hash, PasswordHash::create("123").unwrap(), "salt must differ");
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!PasswordHash("123".into()).verify("123"));
        assert!(!PasswordHash("$argon2id$v=19$garbage".into()).verify("123"));
        assert!(!PasswordHash("sha256$00$00".into()).verify("123"));
    }

    #[test]
    fn login_failures_are_indistinguishable() {
        let users = users_with("kasir", "123", Role::Kasir);
        let registry = SessionRegistry::new();

        let wrong_password = registry.login(&users, "kasir", "999").unwrap_err();
        let wrong_user = registry.login(&users, "nobody", "123").unwrap_err();
        assert_eq!(wrong_password.to_string(), wrong_user.to_string());
        assert!(matches!(wrong_user, SimrsError::BadCredentials));
    }

    #[test]
    fn session_lifecycle() {
        let users = users_with("dokter", "123", Role::Dokter);
        let registry = SessionRegistry::new();

        let session = registry.login(&users, "dokter", "123").unwrap();
        assert_eq!(session.token.len(), SESSION_TOKEN_LEN);
        assert!(session.token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(session.role(), Role::Dokter);

        let restored = registry.restore(&session.token).unwrap();
        assert_eq!(restored, session);

        assert!(registry.logout(&session.token).unwrap());
        assert!(!registry.logout(&session.token).unwrap());
        assert!(matches!(
            registry.restore(&session.token),
            Err(SimrsError::SessionRequired)
        ));
    }

    #[test]
    fn require_maps_denial_to_forbidden_with_redirect() {
        let users = users_with("kasir", "123", Role::Kasir);
        let registry = SessionRegistry::new();
        let session = registry.login(&users, "kasir", "123").unwrap();

        assert!(session.require(Operation::RecordPayment).is_ok());
        match session.require(Operation::ViewReports).unwrap_err() {
            SimrsError::Forbidden { redirect, page, .. } => {
                assert_eq!(redirect, Page::Billing);
                assert_eq!(page, Page::Reports);
            }
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }

    #[test]
    fn revoke_user_drops_all_their_sessions() {
        let users = users_with("staff", "123", Role::StaffPendaftaran);
        let registry = SessionRegistry::new();
        let a = registry.login(&users, "staff", "123").unwrap();
        let b = registry.login(&users, "staff", "123").unwrap();
        assert_ne!(a.token, b.token);

        assert_eq!(registry.revoke_user(a.user.id).unwrap(), 2);
        assert!(registry.restore(&b.token).is_err());
    }
}
