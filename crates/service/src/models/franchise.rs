//! Franchises and their stores.

use serde::{Deserialize, Serialize};

use jwt_pizza_core::{Email, FranchiseId, Price, StoreId, UserId};

/// A user listed as administrator of a franchise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FranchiseAdmin {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}

/// A physical store belonging to one franchise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    pub franchise_id: FranchiseId,
    pub name: String,
    /// Sum of order item prices; only filled in for privileged views.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_revenue: Option<Price>,
}

/// A franchise with its administrators and stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Franchise {
    pub id: FranchiseId,
    pub name: String,
    /// Hidden from the public franchise listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admins: Option<Vec<FranchiseAdmin>>,
    pub stores: Vec<Store>,
}

impl Franchise {
    /// Whether `user` is one of this franchise's administrators.
    #[must_use]
    pub fn is_admin(&self, user: UserId) -> bool {
        self.admins
            .as_deref()
            .is_some_and(|admins| admins.iter().any(|admin| admin.id == user))
    }

    /// Strip administrator and revenue details for anonymous listings.
    #[must_use]
    pub fn into_public(self) -> Self {
        Self {
            admins: None,
            stores: self
                .stores
                .into_iter()
                .map(|store| Store {
                    total_revenue: None,
                    ..store
                })
                .collect(),
            ..self
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Franchise {
        Franchise {
            id: FranchiseId::new(1),
            name: "pizzaPocket".to_string(),
            admins: Some(vec![FranchiseAdmin {
                id: UserId::new(3),
                name: "pizza franchisee".to_string(),
                email: Email::parse("f@jwt.com").unwrap(),
            }]),
            stores: vec![Store {
                id: StoreId::new(1),
                franchise_id: FranchiseId::new(1),
                name: "SLC".to_string(),
                total_revenue: Some(Price::new("0.05".parse().unwrap()).unwrap()),
            }],
        }
    }

    #[test]
    fn test_is_admin() {
        let franchise = sample();
        assert!(franchise.is_admin(UserId::new(3)));
        assert!(!franchise.is_admin(UserId::new(4)));
    }

    #[test]
    fn test_public_view_hides_admins_and_revenue() {
        let json = serde_json::to_value(sample().into_public()).unwrap();
        assert!(json.get("admins").is_none());
        assert_eq!(
            json["stores"][0],
            serde_json::json!({"id": 1, "franchiseId": 1, "name": "SLC"})
        );
    }
}
