//! Bearer token extractors.
//!
//! Handlers that need an identity take [`AuthUser`]; handlers that merely
//! show more to authenticated callers take [`OptionalAuthUser`].

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::state::AppState;

/// An authenticated caller.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(AuthUser { user, .. }: AuthUser) -> Json<User> {
///     Json(user)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// User snapshot taken when the token was issued.
    pub user: User,
    /// The raw bearer token, needed to revoke it on logout.
    pub token: String,
}

/// The bearer token from the `Authorization` header, if any.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;

        let claims = state
            .tokens()
            .validate(state.store(), token)
            .await
            .map_err(|e| {
                if e.is_unauthorized() {
                    tracing::debug!(error = %e, "Rejected bearer token");
                    AppError::Unauthorized
                } else {
                    AppError::Token(e)
                }
            })?;

        let user = claims.into_user();
        set_sentry_user(&user.id, Some(user.email.as_str()));

        Ok(Self {
            user,
            token: token.to_string(),
        })
    }
}

/// A caller who may or may not be authenticated.
///
/// Invalid or revoked tokens are treated as anonymous.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<User>);

impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if bearer_token(parts).is_none() {
            return Ok(Self(None));
        }
        match AuthUser::from_request_parts(parts, state).await {
            Ok(auth) => Ok(Self(Some(auth.user))),
            Err(AppError::Unauthorized) => Ok(Self(None)),
            Err(e) => Err(e),
        }
    }
}
