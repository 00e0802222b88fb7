//! In-process service metrics.
//!
//! Counters are plain atomics bumped on the request path. A background task
//! periodically snapshots them and pushes the snapshot to the metrics
//! collector; a failed push is logged and dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::http::Method;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::task::JoinHandle;
use url::Url;

use jwt_pizza_core::Price;

use crate::config::TelemetryConfig;
use crate::db::PizzaStore;

/// Revenue is tracked in 1e-8 units so it fits in an atomic.
const REVENUE_SCALE: u32 = 8;

/// Running total plus count, for averages.
#[derive(Debug, Default)]
struct LatencyMetric {
    total_ms: AtomicU64,
    count: AtomicU64,
}

impl LatencyMetric {
    fn observe(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.total_ms.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    #[allow(clippy::cast_precision_loss)]
    fn average_ms(&self) -> f64 {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        self.total_ms.load(Ordering::Relaxed) as f64 / count as f64
    }
}

/// Service counters.
#[derive(Debug, Default)]
pub struct Metrics {
    requests_total: AtomicU64,
    requests_get: AtomicU64,
    requests_post: AtomicU64,
    requests_put: AtomicU64,
    requests_delete: AtomicU64,
    auth_success: AtomicU64,
    auth_failure: AtomicU64,
    pizzas_sold: AtomicU64,
    pizza_failures: AtomicU64,
    revenue_units: AtomicU64,
    request_latency: LatencyMetric,
    factory_latency: LatencyMetric,
}

/// Point-in-time view of [`Metrics`], as pushed to the collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_get: u64,
    pub requests_post: u64,
    pub requests_put: u64,
    pub requests_delete: u64,
    pub auth_success: u64,
    pub auth_failure: u64,
    pub active_users: u64,
    pub pizzas_sold: u64,
    pub pizza_failures: u64,
    pub revenue: f64,
    pub request_latency_ms: f64,
    pub factory_latency_ms: f64,
}

impl Metrics {
    /// Create an empty set of counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one HTTP request.
    pub fn record_request(&self, method: &Method, latency: Duration) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        let counter = match *method {
            Method::GET => Some(&self.requests_get),
            Method::POST => Some(&self.requests_post),
            Method::PUT => Some(&self.requests_put),
            Method::DELETE => Some(&self.requests_delete),
            _ => None,
        };
        if let Some(counter) = counter {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        self.request_latency.observe(latency);
    }

    /// Count a login attempt.
    pub fn record_auth(&self, success: bool) {
        let counter = if success {
            &self.auth_success
        } else {
            &self.auth_failure
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an order the factory baked.
    pub fn record_order(&self, pizzas: usize, revenue: Price, latency: Duration) {
        self.pizzas_sold
            .fetch_add(u64::try_from(pizzas).unwrap_or(u64::MAX), Ordering::Relaxed);

        let units = revenue
            .amount()
            .checked_mul(Decimal::new(10_i64.pow(REVENUE_SCALE), 0))
            .and_then(|scaled| scaled.trunc().to_u64())
            .unwrap_or(u64::MAX);
        // Saturating: the closure always returns Some.
        let _ = self
            .revenue_units
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |total| {
                Some(total.saturating_add(units))
            });
        self.factory_latency.observe(latency);
    }

    /// Count an order the factory refused or never answered.
    pub fn record_order_failure(&self, latency: Duration) {
        self.pizza_failures.fetch_add(1, Ordering::Relaxed);
        self.factory_latency.observe(latency);
    }

    /// Read every counter. `active_users` comes from the session store.
    #[must_use]
    pub fn snapshot(&self, active_users: u64) -> MetricsSnapshot {
        let revenue_units = i64::try_from(self.revenue_units.load(Ordering::Relaxed))
            .unwrap_or(i64::MAX);

        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_get: self.requests_get.load(Ordering::Relaxed),
            requests_post: self.requests_post.load(Ordering::Relaxed),
            requests_put: self.requests_put.load(Ordering::Relaxed),
            requests_delete: self.requests_delete.load(Ordering::Relaxed),
            auth_success: self.auth_success.load(Ordering::Relaxed),
            auth_failure: self.auth_failure.load(Ordering::Relaxed),
            active_users,
            pizzas_sold: self.pizzas_sold.load(Ordering::Relaxed),
            pizza_failures: self.pizza_failures.load(Ordering::Relaxed),
            revenue: Decimal::new(revenue_units, REVENUE_SCALE)
                .to_f64()
                .unwrap_or_default(),
            request_latency_ms: self.request_latency.average_ms(),
            factory_latency_ms: self.factory_latency.average_ms(),
        }
    }
}

#[derive(Serialize)]
struct MetricsPush<'a> {
    source: &'a str,
    metrics: &'a MetricsSnapshot,
}

/// Start pushing snapshots to the metrics collector.
///
/// Returns `None` when no collector is configured.
#[must_use]
pub fn spawn_reporter(
    metrics: Arc<Metrics>,
    store: Arc<dyn PizzaStore>,
    config: &TelemetryConfig,
) -> Option<JoinHandle<()>> {
    let url = config.metrics_url.clone()?;
    let api_key = config.metrics_api_key.clone();
    let source = config.source.clone();
    let period = config.metrics_interval;

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "Metrics reporter disabled: HTTP client failed to build");
            return None;
        }
    };

    tracing::info!(%url, interval_secs = period.as_secs(), "Metrics reporter started");

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;

            let active_users = match store.count_active_users().await {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to count active users");
                    0
                }
            };
            let snapshot = metrics.snapshot(active_users);
            push(&client, &url, api_key.as_ref(), &source, &snapshot).await;
        }
    }))
}

async fn push(
    client: &reqwest::Client,
    url: &Url,
    api_key: Option<&SecretString>,
    source: &str,
    snapshot: &MetricsSnapshot,
) {
    let mut request = client.post(url.clone()).json(&MetricsPush {
        source,
        metrics: snapshot,
    });
    if let Some(key) = api_key {
        request = request.bearer_auth(key.expose_secret());
    }

    match request.send().await {
        Ok(response) if !response.status().is_success() => {
            tracing::warn!(status = response.status().as_u16(), "Metrics push rejected");
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Metrics push failed"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_counters_by_method() {
        let metrics = Metrics::new();
        metrics.record_request(&Method::GET, Duration::from_millis(10));
        metrics.record_request(&Method::GET, Duration::from_millis(30));
        metrics.record_request(&Method::DELETE, Duration::from_millis(20));
        metrics.record_request(&Method::PATCH, Duration::from_millis(20));

        let snap = metrics.snapshot(0);
        assert_eq!(snap.requests_total, 4);
        assert_eq!(snap.requests_get, 2);
        assert_eq!(snap.requests_delete, 1);
        assert_eq!(snap.requests_post, 0);
        assert!((snap.request_latency_ms - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_orders_and_revenue() {
        let metrics = Metrics::new();
        let price = Price::new("0.0038".parse().unwrap()).unwrap();
        metrics.record_order(2, price + price, Duration::from_millis(100));
        metrics.record_order_failure(Duration::from_millis(300));
        metrics.record_auth(true);
        metrics.record_auth(false);

        let snap = metrics.snapshot(3);
        assert_eq!(snap.pizzas_sold, 2);
        assert_eq!(snap.pizza_failures, 1);
        assert!((snap.revenue - 0.0076).abs() < 1e-12);
        assert!((snap.factory_latency_ms - 200.0).abs() < f64::EPSILON);
        assert_eq!(snap.auth_success, 1);
        assert_eq!(snap.auth_failure, 1);
        assert_eq!(snap.active_users, 3);
    }

    #[test]
    fn test_huge_revenue_saturates() {
        let metrics = Metrics::new();
        let price = Price::new("999999999999.5".parse().unwrap()).unwrap();
        metrics.record_order(1, price, Duration::ZERO);
        metrics.record_order(1, price, Duration::ZERO);

        let snap = metrics.snapshot(0);
        assert_eq!(snap.pizzas_sold, 2);
        assert!(snap.revenue > 0.0);
    }

    #[test]
    fn test_no_reporter_without_url() {
        let store: Arc<dyn PizzaStore> = Arc::new(crate::db::MemoryStore::new());
        assert!(
            spawn_reporter(Arc::new(Metrics::new()), store, &TelemetryConfig::default()).is_none()
        );
    }
}
