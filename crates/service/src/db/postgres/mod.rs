//! `PostgreSQL` store.
//!
//! Queries are runtime-checked (`sqlx::query_as` + `FromRow`) so the crate
//! builds without a live database. One file per entity.

mod franchises;
mod menu;
mod orders;
mod sessions;
mod users;

use async_trait::async_trait;
use sqlx::PgPool;

use super::{PizzaStore, RepositoryError};

/// Store backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PizzaStore for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Map a foreign-key violation into `RepositoryError::NotFound`.
fn not_found_on_missing_parent(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::NotFound;
    }
    RepositoryError::Database(e)
}

/// Convert a page size into the `LIMIT` that over-fetches one row.
fn overfetch_limit(limit: u32) -> i64 {
    i64::from(limit) + 1
}

/// Convert a row offset into a bindable `OFFSET`.
fn offset(page: crate::models::PageRequest) -> i64 {
    i64::try_from(page.offset()).unwrap_or(i64::MAX)
}
