//! Account service.
//!
//! Registration, password login and profile updates. Passwords are hashed
//! with Argon2id and only ever compared through the PHC string.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use jwt_pizza_core::{Email, Role, UserId};

use crate::db::{PizzaStore, RepositoryError};
use crate::models::{NewUser, User, UserUpdate};

/// Message returned when registration fields are missing.
pub const REGISTER_FIELDS_REQUIRED: &str = "name, email, and password are required";

/// Message returned when login fields are missing.
pub const LOGIN_FIELDS_REQUIRED: &str = "email and password are required";

/// Account service over any [`PizzaStore`].
pub struct AuthService<'a> {
    store: &'a dyn PizzaStore,
}

impl<'a> AuthService<'a> {
    /// Create a new account service.
    #[must_use]
    pub const fn new(store: &'a dyn PizzaStore) -> Self {
        Self { store }
    }

    /// Register a diner.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if any field is blank,
    /// `AuthError::InvalidEmail` for a malformed email and
    /// `AuthError::UserAlreadyExists` if the email is taken.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        self.create_with_roles(name, email, password, vec![Role::Diner])
            .await
    }

    /// Create a global admin. Used by the CLI and the in-memory demo seed.
    ///
    /// # Errors
    ///
    /// Same as [`AuthService::register`].
    pub async fn create_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        self.create_with_roles(name, email, password, vec![Role::Admin])
            .await
    }

    /// Create the admin unless the email is already registered.
    ///
    /// # Errors
    ///
    /// Same as [`AuthService::create_admin`].
    pub async fn ensure_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        if let Some(existing) = self.store.get_user_by_email(&Email::parse(email)?).await? {
            return Ok(existing);
        }
        self.create_admin(name, email, password).await
    }

    async fn create_with_roles(
        &self,
        name: &str,
        email: &str,
        password: &str,
        roles: Vec<Role>,
    ) -> Result<User, AuthError> {
        if [name, email, password].iter().any(|f| f.trim().is_empty()) {
            return Err(AuthError::MissingFields(REGISTER_FIELDS_REQUIRED));
        }
        let email = Email::parse(email)?;
        let password_hash = hash_password(password)?;

        self.store
            .create_user(NewUser {
                name: name.trim().to_string(),
                email,
                password_hash,
                roles,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` for blank input and
    /// `AuthError::InvalidCredentials` if the email is unknown or the
    /// password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields(LOGIN_FIELDS_REQUIRED));
        }
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .store
            .get_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Update name, email and/or password. Blank fields are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` for an unknown id and
    /// `AuthError::UserAlreadyExists` if the new email is taken.
    pub async fn update(
        &self,
        id: UserId,
        name: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<User, AuthError> {
        let update = UserUpdate {
            name: non_blank(name).map(str::to_string),
            email: non_blank(email).map(Email::parse).transpose()?,
            password_hash: password
                .filter(|p| !p.is_empty())
                .map(hash_password)
                .transpose()?,
        };

        if update.is_empty() {
            return self
                .store
                .get_user(id)
                .await?
                .ok_or(AuthError::UserNotFound);
        }

        self.store.update_user(id, update).await.map_err(|e| match e {
            RepositoryError::NotFound => AuthError::UserNotFound,
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })
    }
}

/// Trimmed value, or `None` if absent or blank.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a PHC hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_register_requires_every_field() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        for (name, email, password) in [
            ("", "d@jwt.com", "diner"),
            ("d", " ", "diner"),
            ("d", "d@jwt.com", ""),
        ] {
            let err = auth.register(name, email, password).await.unwrap_err();
            assert!(matches!(err, AuthError::MissingFields(REGISTER_FIELDS_REQUIRED)));
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let user = auth.register("pizza diner", "d@jwt.com", "diner").await.unwrap();
        assert_eq!(user.roles, vec![Role::Diner]);

        let logged_in = auth.login("d@jwt.com", "diner").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            auth.login("d@jwt.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@jwt.com", "diner").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        auth.register("a", "d@jwt.com", "pw").await.unwrap();
        assert!(matches!(
            auth.register("b", "d@jwt.com", "pw").await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_update_password_changes_login() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        let user = auth.register("d", "d@jwt.com", "old").await.unwrap();

        let updated = auth
            .update(user.id, Some("new name"), None, Some("new"))
            .await
            .unwrap();
        assert_eq!(updated.name, "new name");
        assert!(auth.login("d@jwt.com", "old").await.is_err());
        assert!(auth.login("d@jwt.com", "new").await.is_ok());
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let first = auth.ensure_admin("admin", "a@jwt.com", "admin").await.unwrap();
        let second = auth.ensure_admin("admin", "a@jwt.com", "other").await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(first.is_admin());
        assert!(auth.login("a@jwt.com", "admin").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_unknown_user() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        assert!(matches!(
            auth.update(UserId::new(99), Some("x"), None, None).await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[test]
    fn test_hash_roundtrip() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("s3cret", &hash).is_ok());
        assert!(verify_password("other", &hash).is_err());
    }
}
