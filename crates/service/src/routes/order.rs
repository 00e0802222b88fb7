//! Menu and order route handlers.

use std::time::Instant;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use jwt_pizza_core::UserId;

use crate::error::{ApiJson, ApiQuery, AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{MenuItem, NewMenuItem, Order, OrderRequest, PageRequest};
use crate::services::{Action, allow};
use crate::state::AppState;

/// One-based order history paging.
#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// A diner's order history page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHistory {
    pub diner_id: UserId,
    pub orders: Vec<Order>,
    pub page: u32,
    pub more: bool,
}

/// A baked order with the factory's verification token.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order: Order,
    pub jwt: String,
    #[serde(rename = "followLinkToEndChaos", skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
}

/// GET /api/order/menu - The pizza menu.
pub async fn menu(State(state): State<AppState>) -> Result<Json<Vec<MenuItem>>> {
    Ok(Json(state.store().get_menu().await?))
}

/// PUT /api/order/menu - Add a menu item (admin). Answers the whole menu.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn add_menu_item(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(item): ApiJson<NewMenuItem>,
) -> Result<Json<Vec<MenuItem>>> {
    if !allow(&auth.user, Action::AddMenuItem) {
        return Err(AppError::Forbidden("unable to add menu item".to_string()));
    }

    let added = state.store().add_menu_item(item).await?;
    tracing::info!(menu_id = %added.id, "Menu item added");

    Ok(Json(state.store().get_menu().await?))
}

/// GET /api/order - The caller's orders, newest first.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn orders(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> Result<Json<OrderHistory>> {
    let page = query.page.unwrap_or(1).max(1);
    let request = PageRequest::new(
        page - 1,
        query.limit.unwrap_or(PageRequest::DEFAULT_LIMIT),
    );

    let history = state.store().list_orders(auth.user.id, request).await?;

    Ok(Json(OrderHistory {
        diner_id: auth.user.id,
        orders: history.items,
        page,
        more: history.more,
    }))
}

/// POST /api/order - Place an order.
///
/// The order goes to the factory first and is only stored once the
/// factory has accepted it.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(order): ApiJson<OrderRequest>,
) -> Result<Json<OrderResponse>> {
    if !allow(&auth.user, Action::PlaceOrder) {
        return Err(AppError::Forbidden("unauthorized".to_string()));
    }
    validate_order(&state, &order).await?;

    let started = Instant::now();
    let result = state.factory().send_order(&auth.user, &order).await;
    let latency = started.elapsed();

    let receipt = match result {
        Ok(receipt) => {
            state.logger().log_factory(&order, Ok(200));
            receipt
        }
        Err(e) => {
            state.metrics().record_order_failure(latency);
            state.logger().log_factory(&order, Err(&e.to_string()));
            return Err(e.into());
        }
    };

    let stored = state.store().create_order(auth.user.id, &order).await?;
    state
        .metrics()
        .record_order(order.items.len(), order.total(), latency);
    tracing::info!(order_id = %stored.id, "Order fulfilled");

    Ok(Json(OrderResponse {
        order: stored,
        jwt: receipt.jwt,
        report_url: receipt.report_url,
    }))
}

/// Reject orders for stores outside the franchise or for unknown pizzas.
async fn validate_order(state: &AppState, order: &OrderRequest) -> Result<()> {
    if state
        .store()
        .get_store(order.franchise_id, order.store_id)
        .await?
        .is_none()
    {
        return Err(AppError::Validation("unknown store".to_string()));
    }

    let menu = state.store().get_menu().await?;
    if let Some(item) = order
        .items
        .iter()
        .find(|item| !menu.iter().any(|m| m.id == item.menu_id))
    {
        return Err(AppError::Validation(format!(
            "unknown menu item {}",
            item.menu_id
        )));
    }

    Ok(())
}
