//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! pizza-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `PIZZA_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Migration files live in `crates/service/migrations/`.

use super::{CommandError, connect};

/// Run the service migrations.
///
/// # Errors
///
/// Returns error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let store = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../service/migrations")
        .run(store.pool())
        .await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
