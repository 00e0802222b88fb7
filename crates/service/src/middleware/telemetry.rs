//! Request telemetry middleware.
//!
//! Buffers request and response bodies so each exchange can be logged
//! (passwords masked) and counted. Bodies on this API are small JSON
//! documents, so buffering is cheap.

use std::time::Instant;

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::state::AppState;

/// Largest body the middleware will buffer.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Record metrics and a sanitized log entry for every request.
pub async fn telemetry_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let authorized = request.headers().contains_key(AUTHORIZATION);

    let (parts, body) = request.into_parts();
    let Ok(request_body) = to_bytes(body, MAX_BODY_BYTES).await else {
        return AppError::Validation("request body too large".to_string()).into_response();
    };
    let request = Request::from_parts(parts, Body::from(request_body.clone()));

    let response = next.run(request).await;
    let status = response.status();

    let (parts, body) = response.into_parts();
    let response_body = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to buffer response body");
            return AppError::Internal("response body unreadable".to_string()).into_response();
        }
    };

    state.metrics().record_request(&method, started.elapsed());
    state.logger().log_http(
        &method,
        &path,
        status,
        authorized,
        &request_body,
        &response_body,
    );

    Response::from_parts(parts, Body::from(response_body))
}
