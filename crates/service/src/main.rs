//! JWT Pizza Service - REST backend for the pizza ordering demo.
//!
//! This binary serves the JSON API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - `PostgreSQL` via sqlx, or an in-memory store when no database is set
//! - HS256 session tokens backed by a session table
//! - Orders fulfilled by the external pizza factory
//! - Metrics and sanitized request logs pushed to optional collectors

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use jwt_pizza_service::config::{ConfigError, PizzaConfig};
use jwt_pizza_service::db::{self, MemoryStore, PgStore, PizzaStore};
use jwt_pizza_service::services::{AuthError, AuthService};
use jwt_pizza_service::state::{AppState, StateError};
use jwt_pizza_service::telemetry;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default admin seeded into the in-memory store.
const DEMO_ADMIN_NAME: &str = "常用名字";
const DEMO_ADMIN_EMAIL: &str = "a@jwt.com";
const DEMO_ADMIN_PASSWORD: &str = "admin";

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("seed: {0}")]
    Seed(#[from] AuthError),
    #[error("state: {0}")]
    State(#[from] StateError),
    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &PizzaConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Connect to `PostgreSQL`, or fall back to a seeded in-memory store.
async fn open_store(config: &PizzaConfig) -> Result<Arc<dyn PizzaStore>, StartupError> {
    if let Some(url) = &config.database_url {
        let pool = db::create_pool(url).await?;
        tracing::info!("Database pool created");
        // Migrations are NOT run on startup: cargo run -p jwt-pizza-cli -- migrate
        return Ok(Arc::new(PgStore::new(pool)));
    }

    tracing::warn!("No database configured, using the in-memory store; data is lost on exit");
    let store = MemoryStore::new();
    AuthService::new(&store)
        .ensure_admin(DEMO_ADMIN_NAME, DEMO_ADMIN_EMAIL, DEMO_ADMIN_PASSWORD)
        .await?;
    tracing::info!(email = DEMO_ADMIN_EMAIL, "Seeded default admin");
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    // Load configuration from environment (needed for Sentry init)
    let config = PizzaConfig::from_env()?;

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "jwt_pizza_service=info,tower_http=debug".into());

    let json_layer = config
        .json_logs
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!config.json_logs).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let store = open_store(&config).await?;
    let state = AppState::new(config.clone(), store)?;

    let _reporter = telemetry::spawn_reporter(
        state.metrics_handle(),
        state.store_handle(),
        &config.telemetry,
    );

    let app = jwt_pizza_service::app(state);

    let addr = config.socket_addr();
    tracing::info!("jwt-pizza-service listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
