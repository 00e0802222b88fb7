//! User and role queries.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use jwt_pizza_core::{Email, FranchiseId, Role, UserId};

use super::{PgStore, offset, overfetch_limit};
use crate::db::{RepositoryError, UserStore, conflict_on_unique};
use crate::models::{NewUser, Page, PageRequest, User, UserUpdate, like_pattern};

#[derive(FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: Email,
}

#[derive(FromRow)]
struct CredentialRow {
    id: UserId,
    name: String,
    email: Email,
    password: String,
}

#[derive(FromRow)]
struct RoleRow {
    user_id: UserId,
    role: String,
    object_id: Option<FranchiseId>,
}

/// Load the role sets of `rows` and turn them into users, preserving order.
async fn with_roles(pool: &PgPool, rows: Vec<UserRow>) -> Result<Vec<User>, RepositoryError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
    let role_rows = sqlx::query_as::<_, RoleRow>(
        r"
        SELECT user_id, role, object_id
        FROM pizza.user_role
        WHERE user_id = ANY($1)
        ORDER BY id
        ",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut roles: HashMap<UserId, Vec<Role>> = HashMap::new();
    for r in role_rows {
        let role = Role::from_parts(&r.role, r.object_id)
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid role: {e}")))?;
        roles.entry(r.user_id).or_default().push(role);
    }

    Ok(rows
        .into_iter()
        .map(|r| User {
            roles: roles.remove(&r.id).unwrap_or_default(),
            id: r.id,
            name: r.name,
            email: r.email,
        })
        .collect())
}

async fn with_roles_one(pool: &PgPool, row: UserRow) -> Result<User, RepositoryError> {
    with_roles(pool, vec![row])
        .await?
        .pop()
        .ok_or(RepositoryError::NotFound)
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO pizza.user (name, email, password)
            VALUES ($1, $2, $3)
            RETURNING id, name, email
            ",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?;

        for role in &user.roles {
            sqlx::query(
                r"
                INSERT INTO pizza.user_role (user_id, role, object_id)
                VALUES ($1, $2, $3)
                ",
            )
            .bind(row.id)
            .bind(role.name())
            .bind(role.object_id())
            .execute(&mut *tx)
            .await
            .map_err(super::not_found_on_missing_parent)?;
        }

        tx.commit().await?;

        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            roles: user.roles,
        })
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email FROM pizza.user WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(with_roles_one(&self.pool, r).await?)),
            None => Ok(None),
        }
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email FROM pizza.user WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(with_roles_one(&self.pool, r).await?)),
            None => Ok(None),
        }
    }

    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, name, email, password FROM pizza.user WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };

        let user = with_roles_one(
            &self.pool,
            UserRow {
                id: r.id,
                name: r.name,
                email: r.email,
            },
        )
        .await?;

        Ok(Some((user, r.password)))
    }

    async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE pizza.user
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                password = COALESCE($4, password),
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, email
            ",
        )
        .bind(id)
        .bind(update.name)
        .bind(update.email)
        .bind(update.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?
        .ok_or(RepositoryError::NotFound)?;

        with_roles_one(&self.pool, row).await
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM pizza.user WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_users(
        &self,
        page: PageRequest,
        name_filter: &str,
    ) -> Result<Page<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, name, email
            FROM pizza.user
            WHERE name ILIKE $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(like_pattern(name_filter))
        .bind(overfetch_limit(page.limit))
        .bind(offset(page))
        .fetch_all(&self.pool)
        .await?;

        let users = with_roles(&self.pool, rows).await?;
        Ok(Page::from_overfetch(users, page))
    }
}
