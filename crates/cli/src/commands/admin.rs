//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! pizza-cli admin create -e admin@jwt.com -n "Pizza Admin" -p s3cret
//! ```
//!
//! # Environment Variables
//!
//! - `PIZZA_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use jwt_pizza_core::UserId;
use jwt_pizza_service::services::AuthService;

use super::{CommandError, connect};

/// Create a new global admin.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns error if the email is invalid or already registered, or if the
/// database is unreachable.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<UserId, CommandError> {
    let store = connect().await?;

    tracing::info!("Creating admin user: {}", email);
    let user = AuthService::new(&store)
        .create_admin(name, email, password)
        .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(user.id)
}
