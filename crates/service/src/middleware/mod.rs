//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `CatchPanicLayer` (panics become a 500 `{message}`)
//! 3. `TraceLayer` (request span)
//! 4. Request ID (record and echo `x-request-id`)
//! 5. CORS (the web client runs on another origin)
//! 6. Telemetry (metrics and sanitized request log)

pub mod auth;
pub mod request_id;
pub mod telemetry;

pub use auth::{AuthUser, OptionalAuthUser};
pub use request_id::request_id_middleware;
pub use telemetry::telemetry_middleware;
