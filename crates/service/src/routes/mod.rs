//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                                  - Welcome
//! GET    /health                            - Liveness
//! GET    /health/ready                      - Readiness (store ping)
//! GET    /api/docs                          - Endpoint listing
//!
//! # Auth
//! POST   /api/auth                          - Register
//! PUT    /api/auth                          - Login
//! DELETE /api/auth                          - Logout
//!
//! # Users
//! GET    /api/user/me                       - Authenticated user
//! GET    /api/user                          - List users (admin)
//! PUT    /api/user/{userId}                 - Update user (self or admin)
//! DELETE /api/user/{userId}                 - Delete user (admin)
//!
//! # Orders
//! GET    /api/order/menu                    - Menu
//! PUT    /api/order/menu                    - Add menu item (admin)
//! GET    /api/order                         - Diner's orders
//! POST   /api/order                         - Place order
//!
//! # Franchises
//! GET    /api/franchise                     - List franchises
//! GET    /api/franchise/{userId}            - A user's franchises
//! POST   /api/franchise                     - Create franchise (admin)
//! DELETE /api/franchise/{franchiseId}       - Delete franchise (admin)
//! POST   /api/franchise/{franchiseId}/store - Create store
//! DELETE /api/franchise/{franchiseId}/store/{storeId} - Delete store
//! ```
//!
//! Anything else answers 404 `{"message": "unknown endpoint"}`.

pub mod auth;
pub mod docs;
pub mod franchise;
pub mod order;
pub mod user;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new().route(
        "/api/auth",
        post(auth::register).put(auth::login).delete(auth::logout),
    )
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/user", get(user::list))
        .route("/api/user/me", get(user::me))
        .route("/api/user/{user_id}", put(user::update).delete(user::delete))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/api/order/menu", get(order::menu).put(order::add_menu_item))
        .route("/api/order", get(order::orders).post(order::create))
}

/// Create the franchise routes router.
pub fn franchise_routes() -> Router<AppState> {
    Router::new()
        .route("/api/franchise", get(franchise::list).post(franchise::create))
        .route(
            "/api/franchise/{id}",
            get(franchise::user_franchises).delete(franchise::delete),
        )
        .route("/api/franchise/{id}/store", post(franchise::create_store))
        .route(
            "/api/franchise/{id}/store/{store_id}",
            delete(franchise::delete_store),
        )
}

/// Create the main application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(docs::welcome))
        .route("/health", get(docs::health))
        .route("/health/ready", get(docs::readiness))
        .route("/api/docs", get(docs::docs))
        .merge(auth_routes())
        .merge(user_routes())
        .merge(order_routes())
        .merge(franchise_routes())
        .fallback(docs::unknown_endpoint)
        .method_not_allowed_fallback(docs::unknown_endpoint)
}

#[cfg(test)]
mod tests;
