//! User roles.
//!
//! A user holds a set of roles. `Diner` is granted on registration, `Admin`
//! is global, and `Franchisee` is scoped to a single franchise.

use serde::{Deserialize, Serialize};

use crate::FranchiseId;

/// Errors that can occur when rebuilding a [`Role`] from storage.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RoleError {
    /// The role name is not one of `diner`, `admin`, `franchisee`.
    #[error("unknown role: {0}")]
    Unknown(String),
    /// A franchisee role was stored without its franchise.
    #[error("franchisee role requires a franchise id")]
    MissingFranchise,
}

/// A role held by a user.
///
/// Serializes the same way the web client expects:
///
/// ```
/// use jwt_pizza_core::{FranchiseId, Role};
///
/// let role = Role::Franchisee { object_id: FranchiseId::new(3) };
/// assert_eq!(
///     serde_json::to_string(&role).unwrap(),
///     r#"{"role":"franchisee","objectId":3}"#
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Role {
    /// May browse the menu and place orders.
    Diner,
    /// Global administrator.
    Admin,
    /// Administrator of one franchise.
    Franchisee {
        /// The franchise this role applies to.
        #[serde(rename = "objectId")]
        object_id: FranchiseId,
    },
}

impl Role {
    /// The role name as stored in the database.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Diner => "diner",
            Self::Admin => "admin",
            Self::Franchisee { .. } => "franchisee",
        }
    }

    /// The franchise a scoped role refers to.
    #[must_use]
    pub const fn object_id(&self) -> Option<FranchiseId> {
        match self {
            Self::Franchisee { object_id } => Some(*object_id),
            Self::Diner | Self::Admin => None,
        }
    }

    /// Rebuild a role from its stored name and optional franchise.
    ///
    /// # Errors
    ///
    /// Returns `RoleError::Unknown` for unrecognized names and
    /// `RoleError::MissingFranchise` for a franchisee row without a franchise.
    pub fn from_parts(name: &str, object_id: Option<FranchiseId>) -> Result<Self, RoleError> {
        match name {
            "diner" => Ok(Self::Diner),
            "admin" => Ok(Self::Admin),
            "franchisee" => object_id
                .map(|object_id| Self::Franchisee { object_id })
                .ok_or(RoleError::MissingFranchise),
            other => Err(RoleError::Unknown(other.to_owned())),
        }
    }
}

/// Whether a role set contains the global admin role.
#[must_use]
pub fn is_admin(roles: &[Role]) -> bool {
    roles.contains(&Role::Admin)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_roles_serialize_without_object() {
        assert_eq!(
            serde_json::to_string(&Role::Diner).unwrap(),
            r#"{"role":"diner"}"#
        );
        let admin: Role = serde_json::from_str(r#"{"role":"admin"}"#).unwrap();
        assert_eq!(admin, Role::Admin);
    }

    #[test]
    fn test_from_parts() {
        let franchise = FranchiseId::new(9);
        assert_eq!(
            Role::from_parts("franchisee", Some(franchise)).unwrap(),
            Role::Franchisee {
                object_id: franchise
            }
        );
        assert_eq!(
            Role::from_parts("franchisee", None),
            Err(RoleError::MissingFranchise)
        );
        assert!(matches!(
            Role::from_parts("chef", None),
            Err(RoleError::Unknown(_))
        ));
    }

    #[test]
    fn test_is_admin() {
        let roles = [
            Role::Diner,
            Role::Franchisee {
                object_id: FranchiseId::new(2),
            },
        ];
        assert!(!is_admin(&roles));
        assert!(is_admin(&[Role::Diner, Role::Admin]));
    }
}
