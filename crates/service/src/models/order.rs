//! Diner orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use jwt_pizza_core::{FranchiseId, MenuItemId, OrderId, Price, StoreId, UserId};

/// One pizza in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub menu_id: MenuItemId,
    pub description: String,
    pub price: Price,
}

/// An order as submitted by a diner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub franchise_id: FranchiseId,
    pub store_id: StoreId,
    pub items: Vec<OrderItem>,
}

impl OrderRequest {
    /// Total price of all items.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(|item| item.price).sum()
    }
}

/// An order accepted by the factory and persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub diner_id: UserId,
    pub franchise_id: FranchiseId,
    pub store_id: StoreId,
    pub date: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_client_field_names() {
        let request: OrderRequest = serde_json::from_value(serde_json::json!({
            "franchiseId": 1,
            "storeId": 2,
            "items": [
                {"menuId": 1, "description": "Veggie", "price": 0.0038},
                {"menuId": 2, "description": "Pepperoni", "price": 0.0042}
            ]
        }))
        .unwrap();

        assert_eq!(request.store_id, StoreId::new(2));
        assert_eq!(request.items.len(), 2);
        assert_eq!(request.total().to_string(), "0.008");
    }
}
