//! Order history queries.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use jwt_pizza_core::{FranchiseId, MenuItemId, OrderId, Price, StoreId, UserId};

use super::{PgStore, offset, overfetch_limit};
use crate::db::{OrderStore, RepositoryError};
use crate::models::{Order, OrderItem, OrderRequest, Page, PageRequest};

#[derive(FromRow)]
struct OrderRow {
    id: OrderId,
    diner_id: UserId,
    franchise_id: FranchiseId,
    store_id: StoreId,
    date: DateTime<Utc>,
}

#[derive(FromRow)]
struct ItemRow {
    order_id: OrderId,
    menu_id: MenuItemId,
    description: String,
    price: Price,
}

#[async_trait]
impl OrderStore for PgStore {
    async fn create_order(
        &self,
        diner: UserId,
        order: &OrderRequest,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO pizza.diner_order (diner_id, franchise_id, store_id, date)
            VALUES ($1, $2, $3, now())
            RETURNING id, diner_id, franchise_id, store_id, date
            ",
        )
        .bind(diner)
        .bind(order.franchise_id)
        .bind(order.store_id)
        .fetch_one(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                r"
                INSERT INTO pizza.order_item (order_id, menu_id, description, price)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(row.id)
            .bind(item.menu_id)
            .bind(&item.description)
            .bind(item.price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Order {
            id: row.id,
            diner_id: row.diner_id,
            franchise_id: row.franchise_id,
            store_id: row.store_id,
            date: row.date,
            items: order.items.clone(),
        })
    }

    async fn list_orders(
        &self,
        diner: UserId,
        page: PageRequest,
    ) -> Result<Page<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, diner_id, franchise_id, store_id, date
            FROM pizza.diner_order
            WHERE diner_id = $1
            ORDER BY id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(diner)
        .bind(overfetch_limit(page.limit))
        .bind(offset(page))
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Page::from_overfetch(Vec::new(), page));
        }

        let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
        let item_rows = sqlx::query_as::<_, ItemRow>(
            r"
            SELECT order_id, menu_id, description, price
            FROM pizza.order_item
            WHERE order_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for i in item_rows {
            items.entry(i.order_id).or_default().push(OrderItem {
                menu_id: i.menu_id,
                description: i.description,
                price: i.price,
            });
        }

        let orders = rows
            .into_iter()
            .map(|r| Order {
                items: items.remove(&r.id).unwrap_or_default(),
                id: r.id,
                diner_id: r.diner_id,
                franchise_id: r.franchise_id,
                store_id: r.store_id,
                date: r.date,
            })
            .collect();

        Ok(Page::from_overfetch(orders, page))
    }
}
