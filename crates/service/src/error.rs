//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`
//! and every error body has the shape `{"message": "..."}`.

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, FactoryError, TokenError};

/// Message sent with every 401.
pub const UNAUTHORIZED_MESSAGE: &str = "unauthorized";

/// Message sent when the factory fails to bake an order.
pub const FACTORY_FAILURE_MESSAGE: &str = "Failed to fulfill order at factory";

/// Application-level error type for the pizza service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Account operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session token operation failed.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Bad request from client.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing, invalid or revoked credentials.
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An upstream service failed; the diagnostic link is passed through.
    #[error("Upstream error: {message}")]
    Upstream {
        message: String,
        report_url: Option<String>,
    },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(rename = "followLinkToEndChaos", skip_serializing_if = "Option::is_none")]
    report_url: Option<String>,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::Auth(err) => match err {
                AuthError::MissingFields(_) | AuthError::InvalidEmail(_) => {
                    StatusCode::BAD_REQUEST
                }
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Token(err) if err.is_unauthorized() => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Database(_) | Self::Token(_) | Self::Upstream { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing message. Internal details are never exposed.
    fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "not found".to_string(),
            Self::Database(RepositoryError::Conflict(what)) => what.clone(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Auth(err) => match err {
                AuthError::MissingFields(msg) => (*msg).to_string(),
                AuthError::InvalidEmail(_) => "invalid email address".to_string(),
                AuthError::InvalidCredentials => UNAUTHORIZED_MESSAGE.to_string(),
                AuthError::UserNotFound => "unknown user".to_string(),
                AuthError::UserAlreadyExists => "email already registered".to_string(),
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    "Internal server error".to_string()
                }
            },
            Self::Token(err) if err.is_unauthorized() => UNAUTHORIZED_MESSAGE.to_string(),
            Self::Token(_) => "Internal server error".to_string(),
            Self::Unauthorized => UNAUTHORIZED_MESSAGE.to_string(),
            Self::Validation(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::Upstream { message: msg, .. } => msg.clone(),
        }
    }
}

impl From<FactoryError> for AppError {
    fn from(err: FactoryError) -> Self {
        Self::Upstream {
            message: FACTORY_FAILURE_MESSAGE.to_string(),
            report_url: err.report_url().map(str::to_string),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let report_url = match &self {
            Self::Upstream { report_url, .. } => report_url.clone(),
            _ => None,
        };

        let body = ErrorBody {
            message: self.public_message(),
            report_url,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// JSON body extractor whose rejections render as `{message}`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections render as `{message}`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query extractor whose rejections render as `{message}`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Forbidden("no".to_string()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Validation("bad".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Database(RepositoryError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Auth(AuthError::UserAlreadyExists).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Token(TokenError::Revoked).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Internal("boom".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_body_is_message_json() {
        let (status, json) = body_json(AppError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json, serde_json::json!({"message": "unauthorized"}));
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (_, json) = body_json(AppError::Internal("secret detail".to_string())).await;
        assert_eq!(json["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_factory_failure_carries_report_url() {
        let err = AppError::from(FactoryError::Rejected {
            status: 500,
            report_url: Some("https://factory/report/1".to_string()),
        });
        let (status, json) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json,
            serde_json::json!({
                "message": "Failed to fulfill order at factory",
                "followLinkToEndChaos": "https://factory/report/1"
            })
        );
    }
}
