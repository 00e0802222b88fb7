//! Best-effort observability sinks.
//!
//! - [`Metrics`] - atomic counters pushed periodically to a collector
//! - [`RequestLogger`] - sanitized per-request log entries
//!
//! Nothing here can fail a request.

pub mod logger;
pub mod metrics;

pub use logger::{RequestLogger, sanitize, sanitize_body};
pub use metrics::{Metrics, MetricsSnapshot, spawn_reporter};
