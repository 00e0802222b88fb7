//! User domain types.

use serde::{Deserialize, Serialize};

use jwt_pizza_core::{Email, Role, UserId, is_admin};

/// A registered user as returned to clients. Never carries the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub roles: Vec<Role>,
}

impl User {
    /// Whether the user holds the global admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        is_admin(&self.roles)
    }
}

/// Data needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub roles: Vec<Role>,
}

/// A partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<Email>,
    /// Argon2 PHC string of the new password.
    pub password_hash: Option<String>,
}

impl UserUpdate {
    /// Whether the update changes anything.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password_hash.is_none()
    }
}
