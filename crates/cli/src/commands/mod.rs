//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use jwt_pizza_service::db::{PgStore, RepositoryError, create_pool};
use jwt_pizza_service::services::AuthError;
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Repository(#[from] RepositoryError),

    /// Account operation failed.
    #[error("Account error: {0}")]
    Auth(#[from] AuthError),
}

/// Read `PIZZA_DATABASE_URL` (or `DATABASE_URL`) after loading `.env`.
fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("PIZZA_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("PIZZA_DATABASE_URL"))
}

/// Connect to the configured database.
async fn connect() -> Result<PgStore, CommandError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(PgStore::new(create_pool(&url).await?))
}
