//! Session digest queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use jwt_pizza_core::UserId;

use super::PgStore;
use crate::db::{RepositoryError, SessionStore};

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(
        &self,
        user: UserId,
        token_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Expired sessions of this user are dead weight; drop them while we're here.
        sqlx::query("DELETE FROM pizza.auth WHERE user_id = $1 AND expires_at <= now()")
            .bind(user)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r"
            INSERT INTO pizza.auth (token_digest, user_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (token_digest) DO NOTHING
            ",
        )
        .bind(token_digest)
        .bind(user)
        .bind(expires_at)
        .execute(&mut *tx)
        .await
        .map_err(super::not_found_on_missing_parent)?;

        tx.commit().await?;
        Ok(())
    }

    async fn session_active(&self, token_digest: &str) -> Result<bool, RepositoryError> {
        let active: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM pizza.auth
                WHERE token_digest = $1 AND expires_at > now()
            )
            ",
        )
        .bind(token_digest)
        .fetch_one(&self.pool)
        .await?;

        Ok(active)
    }

    async fn delete_session(&self, token_digest: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM pizza.auth WHERE token_digest = $1")
            .bind(token_digest)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_user_sessions(&self, user: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM pizza.auth WHERE user_id = $1")
            .bind(user)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn count_active_users(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT user_id) FROM pizza.auth WHERE expires_at > now()",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}
