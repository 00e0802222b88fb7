//! Service info, API docs and health checks.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Service version reported by `/` and `/api/docs`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// One documented endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDoc {
    pub method: &'static str,
    pub path: &'static str,
    pub requires_auth: bool,
    pub description: &'static str,
}

const fn endpoint(
    method: &'static str,
    path: &'static str,
    requires_auth: bool,
    description: &'static str,
) -> EndpointDoc {
    EndpointDoc {
        method,
        path,
        requires_auth,
        description,
    }
}

/// Every public endpoint.
pub const ENDPOINTS: &[EndpointDoc] = &[
    endpoint("POST", "/api/auth", false, "Register a new diner"),
    endpoint("PUT", "/api/auth", false, "Login"),
    endpoint("DELETE", "/api/auth", true, "Logout"),
    endpoint("GET", "/api/user/me", true, "Get the authenticated user"),
    endpoint("GET", "/api/user?page=0&limit=10&name=*", true, "List users (admin)"),
    endpoint("PUT", "/api/user/:userId", true, "Update a user (self or admin)"),
    endpoint("DELETE", "/api/user/:userId", true, "Delete a user (admin)"),
    endpoint("GET", "/api/order/menu", false, "Get the pizza menu"),
    endpoint("PUT", "/api/order/menu", true, "Add a menu item (admin)"),
    endpoint("GET", "/api/order?page=1", true, "Get the diner's orders"),
    endpoint("POST", "/api/order", true, "Create an order for the diner"),
    endpoint("GET", "/api/franchise?page=0&limit=10&name=*", false, "List franchises"),
    endpoint("GET", "/api/franchise/:userId", true, "List a user's franchises"),
    endpoint("POST", "/api/franchise", true, "Create a franchise (admin)"),
    endpoint("DELETE", "/api/franchise/:franchiseId", true, "Delete a franchise (admin)"),
    endpoint("POST", "/api/franchise/:franchiseId/store", true, "Create a store"),
    endpoint("DELETE", "/api/franchise/:franchiseId/store/:storeId", true, "Delete a store"),
];

#[derive(Debug, Serialize)]
pub struct Welcome {
    pub message: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DocsConfig {
    pub factory: String,
    pub db: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Docs {
    pub version: &'static str,
    pub endpoints: &'static [EndpointDoc],
    pub config: DocsConfig,
}

/// GET / - Welcome.
pub async fn welcome() -> Json<Welcome> {
    Json(Welcome {
        message: "welcome to JWT Pizza",
        version: VERSION,
    })
}

/// GET /api/docs - Endpoint listing and public configuration.
pub async fn docs(State(state): State<AppState>) -> Json<Docs> {
    let db = if state.config().database_url.is_some() {
        "postgres"
    } else {
        "memory"
    };

    Json(Docs {
        version: VERSION,
        endpoints: ENDPOINTS,
        config: DocsConfig {
            factory: state.config().factory.url.to_string(),
            db,
        },
    })
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Fallback for every unmatched route.
pub async fn unknown_endpoint() -> AppError {
    AppError::NotFound("unknown endpoint".to_string())
}
