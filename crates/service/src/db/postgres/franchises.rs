//! Franchise and store queries.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use jwt_pizza_core::{Email, FranchiseId, Price, StoreId, UserId};

use super::{PgStore, not_found_on_missing_parent, offset, overfetch_limit};
use crate::db::{FranchiseStore, RepositoryError, conflict_on_unique};
use crate::models::{Franchise, FranchiseAdmin, Page, PageRequest, Store, like_pattern};

#[derive(FromRow)]
struct FranchiseRow {
    id: FranchiseId,
    name: String,
}

#[derive(FromRow)]
struct AdminRow {
    franchise_id: FranchiseId,
    id: UserId,
    name: String,
    email: Email,
}

#[derive(FromRow)]
struct StoreRow {
    id: StoreId,
    franchise_id: FranchiseId,
    name: String,
    total_revenue: Price,
}

/// Attach admins and stores (with revenue) to franchise rows, preserving order.
async fn hydrate(
    pool: &PgPool,
    rows: Vec<FranchiseRow>,
) -> Result<Vec<Franchise>, RepositoryError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();

    let admin_rows = sqlx::query_as::<_, AdminRow>(
        r"
        SELECT r.object_id AS franchise_id, u.id, u.name, u.email
        FROM pizza.user_role r
        JOIN pizza.user u ON u.id = r.user_id
        WHERE r.role = 'franchisee' AND r.object_id = ANY($1)
        ORDER BY u.id
        ",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let store_rows = sqlx::query_as::<_, StoreRow>(
        r"
        SELECT s.id, s.franchise_id, s.name,
               COALESCE(SUM(i.price), 0) AS total_revenue
        FROM pizza.store s
        LEFT JOIN pizza.diner_order o ON o.store_id = s.id
        LEFT JOIN pizza.order_item i ON i.order_id = o.id
        WHERE s.franchise_id = ANY($1)
        GROUP BY s.id, s.franchise_id, s.name
        ORDER BY s.id
        ",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut admins: HashMap<FranchiseId, Vec<FranchiseAdmin>> = HashMap::new();
    for a in admin_rows {
        admins.entry(a.franchise_id).or_default().push(FranchiseAdmin {
            id: a.id,
            name: a.name,
            email: a.email,
        });
    }

    let mut stores: HashMap<FranchiseId, Vec<Store>> = HashMap::new();
    for s in store_rows {
        stores.entry(s.franchise_id).or_default().push(Store {
            id: s.id,
            franchise_id: s.franchise_id,
            name: s.name,
            total_revenue: Some(s.total_revenue),
        });
    }

    Ok(rows
        .into_iter()
        .map(|r| Franchise {
            admins: Some(admins.remove(&r.id).unwrap_or_default()),
            stores: stores.remove(&r.id).unwrap_or_default(),
            id: r.id,
            name: r.name,
        })
        .collect())
}

#[async_trait]
impl FranchiseStore for PgStore {
    async fn create_franchise(
        &self,
        name: &str,
        admins: &[UserId],
    ) -> Result<Franchise, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, FranchiseRow>(
            "INSERT INTO pizza.franchise (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "franchise"))?;

        for admin in admins {
            sqlx::query(
                r"
                INSERT INTO pizza.user_role (user_id, role, object_id)
                VALUES ($1, 'franchisee', $2)
                ",
            )
            .bind(admin)
            .bind(row.id)
            .execute(&mut *tx)
            .await
            .map_err(not_found_on_missing_parent)?;
        }

        tx.commit().await?;

        hydrate(&self.pool, vec![row])
            .await?
            .pop()
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_franchise(&self, id: FranchiseId) -> Result<bool, RepositoryError> {
        // Stores and franchisee roles go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM pizza.franchise WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_franchise(&self, id: FranchiseId) -> Result<Option<Franchise>, RepositoryError> {
        let row = sqlx::query_as::<_, FranchiseRow>(
            "SELECT id, name FROM pizza.franchise WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(hydrate(&self.pool, vec![r]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_franchises(
        &self,
        page: PageRequest,
        name_filter: &str,
    ) -> Result<Page<Franchise>, RepositoryError> {
        let rows = sqlx::query_as::<_, FranchiseRow>(
            r"
            SELECT id, name
            FROM pizza.franchise
            WHERE name ILIKE $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(like_pattern(name_filter))
        .bind(overfetch_limit(page.limit))
        .bind(offset(page))
        .fetch_all(&self.pool)
        .await?;

        let franchises = hydrate(&self.pool, rows).await?;
        Ok(Page::from_overfetch(franchises, page))
    }

    async fn get_user_franchises(&self, user: UserId) -> Result<Vec<Franchise>, RepositoryError> {
        let rows = sqlx::query_as::<_, FranchiseRow>(
            r"
            SELECT f.id, f.name
            FROM pizza.franchise f
            JOIN pizza.user_role r ON r.object_id = f.id
            WHERE r.role = 'franchisee' AND r.user_id = $1
            ORDER BY f.id
            ",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        hydrate(&self.pool, rows).await
    }

    async fn get_store(
        &self,
        franchise: FranchiseId,
        store: StoreId,
    ) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, (StoreId, FranchiseId, String)>(
            "SELECT id, franchise_id, name FROM pizza.store WHERE id = $1 AND franchise_id = $2",
        )
        .bind(store)
        .bind(franchise)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, franchise_id, name)| Store {
            id,
            franchise_id,
            name,
            total_revenue: None,
        }))
    }

    async fn create_store(
        &self,
        franchise: FranchiseId,
        name: &str,
    ) -> Result<Store, RepositoryError> {
        let (id, franchise_id, name) = sqlx::query_as::<_, (StoreId, FranchiseId, String)>(
            r"
            INSERT INTO pizza.store (franchise_id, name)
            VALUES ($1, $2)
            RETURNING id, franchise_id, name
            ",
        )
        .bind(franchise)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_on_missing_parent)?;

        Ok(Store {
            id,
            franchise_id,
            name,
            total_revenue: None,
        })
    }

    async fn delete_store(
        &self,
        franchise: FranchiseId,
        store: StoreId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM pizza.store WHERE id = $1 AND franchise_id = $2")
            .bind(store)
            .bind(franchise)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
