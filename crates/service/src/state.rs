//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::PizzaConfig;
use crate::db::PizzaStore;
use crate::services::{FactoryClient, FactoryError, TokenService};
use crate::telemetry::{Metrics, RequestLogger};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("factory client: {0}")]
    Factory(#[from] FactoryError),
    #[error("log client: {0}")]
    Logger(#[from] reqwest::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the store, the token service, the factory client and telemetry.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: PizzaConfig,
    store: Arc<dyn PizzaStore>,
    tokens: TokenService,
    factory: FactoryClient,
    metrics: Arc<Metrics>,
    logger: RequestLogger,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: PizzaConfig, store: Arc<dyn PizzaStore>) -> Result<Self, StateError> {
        let tokens = TokenService::new(&config.jwt);
        let factory = FactoryClient::new(&config.factory)?;
        let logger = RequestLogger::new(&config.telemetry)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                tokens,
                factory,
                metrics: Arc::new(Metrics::new()),
                logger,
            }),
        })
    }

    /// Get a reference to the service configuration.
    #[must_use]
    pub fn config(&self) -> &PizzaConfig {
        &self.inner.config
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &dyn PizzaStore {
        self.inner.store.as_ref()
    }

    /// Get a shared handle to the store, for background tasks.
    #[must_use]
    pub fn store_handle(&self) -> Arc<dyn PizzaStore> {
        Arc::clone(&self.inner.store)
    }

    /// Get a reference to the token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Get a reference to the pizza factory client.
    #[must_use]
    pub fn factory(&self) -> &FactoryClient {
        &self.inner.factory
    }

    /// Get a reference to the service metrics.
    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    /// Get a shared handle to the service metrics, for the reporter task.
    #[must_use]
    pub fn metrics_handle(&self) -> Arc<Metrics> {
        Arc::clone(&self.inner.metrics)
    }

    /// Get a reference to the request logger.
    #[must_use]
    pub fn logger(&self) -> &RequestLogger {
        &self.inner.logger
    }
}
