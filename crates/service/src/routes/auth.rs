//! Authentication route handlers.
//!
//! Registration and login both answer `{user, token}`; the token is
//! immediately usable as a bearer credential.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{ApiJson, AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::AuthUser;
use crate::models::User;
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

/// Registration body. Fields are optional so a missing one yields the
/// fixed validation message instead of a deserialization error.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Login body.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A user together with a fresh session token.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// Plain `{message}` acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// POST /api/auth - Register a diner.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    let user = AuthService::new(state.store())
        .register(
            body.name.as_deref().unwrap_or_default(),
            body.email.as_deref().unwrap_or_default(),
            body.password.as_deref().unwrap_or_default(),
        )
        .await?;

    let token = state.tokens().issue(state.store(), &user).await?;
    tracing::info!(user_id = %user.id, "User registered");

    Ok(Json(AuthResponse { user, token }))
}

/// PUT /api/auth - Login.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let result = AuthService::new(state.store())
        .login(
            body.email.as_deref().unwrap_or_default(),
            body.password.as_deref().unwrap_or_default(),
        )
        .await;

    let user = match result {
        Ok(user) => user,
        Err(e) => {
            if matches!(e, AuthError::InvalidCredentials) {
                state.metrics().record_auth(false);
            }
            return Err(AppError::Auth(e));
        }
    };
    state.metrics().record_auth(true);

    let token = state.tokens().issue(state.store(), &user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok(Json(AuthResponse { user, token }))
}

/// DELETE /api/auth - Logout.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MessageResponse>> {
    state.tokens().revoke(state.store(), &auth.token).await?;
    clear_sentry_user();

    Ok(MessageResponse::new("logout successful"))
}
