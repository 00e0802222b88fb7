//! Menu items.

use serde::{Deserialize, Serialize};

use jwt_pizza_core::{MenuItemId, Price};

/// A pizza on the global menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub title: String,
    pub description: String,
    pub image: String,
    pub price: Price,
}

/// A menu item before it has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMenuItem {
    pub title: String,
    pub description: String,
    pub image: String,
    pub price: Price,
}
