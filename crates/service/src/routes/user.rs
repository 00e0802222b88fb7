//! User route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use jwt_pizza_core::UserId;

use super::auth::AuthResponse;
use crate::error::{ApiJson, ApiPath, ApiQuery, AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{PageRequest, User};
use crate::services::{Action, AuthService, allow};
use crate::state::AppState;

/// Zero-based paging with an optional `*` name filter.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub name: Option<String>,
}

impl ListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(0),
            self.limit.unwrap_or(PageRequest::DEFAULT_LIMIT),
        )
    }

    pub fn name_filter(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or("*")
    }
}

/// One page of users.
#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
    pub more: bool,
}

/// Profile update body. Blank fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// GET /api/user/me - The caller.
pub async fn me(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}

/// GET /api/user - List users (admin).
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<UserList>> {
    if !allow(&auth.user, Action::ListUsers) {
        return Err(AppError::Forbidden("unauthorized".to_string()));
    }

    let page = state
        .store()
        .list_users(query.page_request(), query.name_filter())
        .await?;

    Ok(Json(UserList {
        users: page.items,
        more: page.more,
    }))
}

/// PUT /api/user/:userId - Update a profile (self or admin).
///
/// Every earlier session of the updated user is revoked and a fresh token
/// is returned.
#[instrument(skip_all, fields(user_id = %auth.user.id, target_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<UpdateUserRequest>,
) -> Result<Json<AuthResponse>> {
    if !allow(&auth.user, Action::UpdateUser(id)) {
        return Err(AppError::Forbidden("unauthorized".to_string()));
    }

    let user = AuthService::new(state.store())
        .update(
            id,
            body.name.as_deref(),
            body.email.as_deref(),
            body.password.as_deref(),
        )
        .await?;

    let token = state.tokens().issue_replacing(state.store(), &user).await?;
    tracing::info!("User updated");

    Ok(Json(AuthResponse { user, token }))
}

/// DELETE /api/user/:userId - Delete a user (admin).
#[instrument(skip_all, fields(user_id = %auth.user.id, target_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<UserId>,
) -> Result<StatusCode> {
    if !allow(&auth.user, Action::DeleteUser) {
        return Err(AppError::Forbidden("unauthorized".to_string()));
    }

    if !state.store().delete_user(id).await? {
        return Err(AppError::NotFound("unknown user".to_string()));
    }
    tracing::info!("User deleted");

    Ok(StatusCode::NO_CONTENT)
}
