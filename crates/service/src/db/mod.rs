//! Data access for the pizza service.
//!
//! # Stores
//!
//! - [`PgStore`] - `PostgreSQL` (schema `pizza`), used in production
//! - [`MemoryStore`] - in-process, used by tests and database-less demos
//!
//! Both implement the per-entity traits below, bundled as [`PizzaStore`] so
//! handlers can hold an `Arc<dyn PizzaStore>`.
//!
//! ## Tables
//!
//! - `user`, `user_role` - Accounts and their role set
//! - `auth` - Active session token digests
//! - `menu` - Global pizza menu
//! - `franchise`, `store` - Franchises and their stores
//! - `diner_order`, `order_item` - Order history (kept when a user is deleted)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/service/migrations/` and run via:
//! ```bash
//! cargo run -p jwt-pizza-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use jwt_pizza_core::{Email, FranchiseId, StoreId, UserId};

use crate::models::{
    Franchise, MenuItem, NewMenuItem, NewUser, Order, OrderRequest, Page, PageRequest, Store,
    User, UserUpdate,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors returned by store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The underlying database failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The row to update or delete does not exist.
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Stored data could not be turned back into a domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user and its roles.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Look a user up by id.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Look a user up by email.
    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Fetch a user together with its password hash, for login.
    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id and
    /// `RepositoryError::Conflict` if the new email is taken.
    async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<User, RepositoryError>;

    /// Hard-delete a user, its roles and its sessions. Orders are kept.
    ///
    /// Returns `false` if the user did not exist.
    async fn delete_user(&self, id: UserId) -> Result<bool, RepositoryError>;

    /// List users whose name matches `name_filter` (`*` wildcards), ordered by id.
    async fn list_users(
        &self,
        page: PageRequest,
        name_filter: &str,
    ) -> Result<Page<User>, RepositoryError>;
}

/// Active session bookkeeping for issued tokens.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Record a token digest as an active session.
    async fn insert_session(
        &self,
        user: UserId,
        token_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Whether the digest belongs to an active, unexpired session.
    async fn session_active(&self, token_digest: &str) -> Result<bool, RepositoryError>;

    /// Drop one session. Returns `false` if it was not active.
    async fn delete_session(&self, token_digest: &str) -> Result<bool, RepositoryError>;

    /// Drop every session of a user. Returns how many were removed.
    async fn delete_user_sessions(&self, user: UserId) -> Result<u64, RepositoryError>;

    /// Number of distinct users holding an unexpired session.
    async fn count_active_users(&self) -> Result<u64, RepositoryError>;
}

/// Global menu storage.
#[async_trait]
pub trait MenuStore: Send + Sync {
    /// The whole menu, ordered by id.
    async fn get_menu(&self) -> Result<Vec<MenuItem>, RepositoryError>;

    /// Append an item to the menu.
    async fn add_menu_item(&self, item: NewMenuItem) -> Result<MenuItem, RepositoryError>;
}

/// Franchise and store storage.
///
/// Franchises returned from here always carry admins and store revenue;
/// callers strip them for unprivileged views.
#[async_trait]
pub trait FranchiseStore: Send + Sync {
    /// Create a franchise and grant each admin the franchisee role for it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken and
    /// `RepositoryError::NotFound` if an admin id does not exist.
    async fn create_franchise(
        &self,
        name: &str,
        admins: &[UserId],
    ) -> Result<Franchise, RepositoryError>;

    /// Delete a franchise, its stores and its franchisee roles.
    async fn delete_franchise(&self, id: FranchiseId) -> Result<bool, RepositoryError>;

    /// A single franchise.
    async fn get_franchise(&self, id: FranchiseId) -> Result<Option<Franchise>, RepositoryError>;

    /// Franchises whose name matches `name_filter`, ordered by id.
    async fn list_franchises(
        &self,
        page: PageRequest,
        name_filter: &str,
    ) -> Result<Page<Franchise>, RepositoryError>;

    /// Franchises administered by `user`.
    async fn get_user_franchises(&self, user: UserId) -> Result<Vec<Franchise>, RepositoryError>;

    /// A store, only if it belongs to `franchise`.
    async fn get_store(
        &self,
        franchise: FranchiseId,
        store: StoreId,
    ) -> Result<Option<Store>, RepositoryError>;

    /// Open a store in a franchise.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the franchise does not exist.
    async fn create_store(
        &self,
        franchise: FranchiseId,
        name: &str,
    ) -> Result<Store, RepositoryError>;

    /// Close a store. Returns `false` if it did not belong to `franchise`.
    async fn delete_store(
        &self,
        franchise: FranchiseId,
        store: StoreId,
    ) -> Result<bool, RepositoryError>;
}

/// Order history storage.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist an order the factory accepted.
    async fn create_order(
        &self,
        diner: UserId,
        order: &OrderRequest,
    ) -> Result<Order, RepositoryError>;

    /// A diner's orders, newest first.
    async fn list_orders(
        &self,
        diner: UserId,
        page: PageRequest,
    ) -> Result<Page<Order>, RepositoryError>;
}

/// Everything the HTTP layer needs from storage.
#[async_trait]
pub trait PizzaStore: UserStore + SessionStore + MenuStore + FranchiseStore + OrderStore {
    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-violation into `RepositoryError::Conflict`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}
