//! Menu queries.

use async_trait::async_trait;

use super::PgStore;
use crate::db::{MenuStore, RepositoryError};
use crate::models::{MenuItem, NewMenuItem};

#[async_trait]
impl MenuStore for PgStore {
    async fn get_menu(&self) -> Result<Vec<MenuItem>, RepositoryError> {
        let items = sqlx::query_as::<_, MenuItem>(
            "SELECT id, title, description, image, price FROM pizza.menu ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn add_menu_item(&self, item: NewMenuItem) -> Result<MenuItem, RepositoryError> {
        let created = sqlx::query_as::<_, MenuItem>(
            r"
            INSERT INTO pizza.menu (title, description, image, price)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, description, image, price
            ",
        )
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.image)
        .bind(item.price)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }
}
