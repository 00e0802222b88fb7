//! Seed the database with the demo menu, franchise and accounts.
//!
//! Safe to run repeatedly: rows that already exist are left alone.
//!
//! # Usage
//!
//! ```bash
//! pizza-cli seed demo
//! ```

use jwt_pizza_core::{Email, Price};
use jwt_pizza_service::db::{FranchiseStore, MenuStore, PgStore, RepositoryError, UserStore};
use jwt_pizza_service::models::{NewMenuItem, PageRequest, User};
use jwt_pizza_service::services::{AuthError, AuthService};
use rust_decimal::Decimal;

use super::{CommandError, connect};

/// Demo menu: title, description, image, price.
const MENU: &[(&str, &str, &str, i64)] = &[
    ("Veggie", "A garden of delight", "pizza1.png", 38),
    ("Pepperoni", "Spicy treat", "pizza2.png", 42),
    ("Margarita", "Essential classic", "pizza3.png", 42),
    ("Crusty", "A dry mouthed favorite", "pizza4.png", 28),
    ("Charred Leopard", "For those with a darker side", "pizza5.png", 99),
];

const FRANCHISE: &str = "pizzaPocket";
const STORE: &str = "SLC";

/// Insert the demo data.
///
/// # Errors
///
/// Returns error if the database is unreachable or an insert fails.
pub async fn demo() -> Result<(), CommandError> {
    let store = connect().await?;

    seed_menu(&store).await?;

    let auth = AuthService::new(&store);
    auth.ensure_admin("常用名字", "a@jwt.com", "admin").await?;
    let diner = register_once(&store, "pizza diner", "d@jwt.com", "diner").await?;
    let franchisee = register_once(&store, "pizza franchisee", "f@jwt.com", "franchisee").await?;
    tracing::info!(diner = %diner.id, franchisee = %franchisee.id, "Accounts ready");

    seed_franchise(&store, &franchisee).await?;

    tracing::info!("Demo data seeded!");
    Ok(())
}

async fn seed_menu(store: &PgStore) -> Result<(), CommandError> {
    if !store.get_menu().await?.is_empty() {
        tracing::info!("Menu already present, skipping");
        return Ok(());
    }

    for &(title, description, image, ten_thousandths) in MENU {
        let price = Price::new(Decimal::new(ten_thousandths, 4))
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        store
            .add_menu_item(NewMenuItem {
                title: title.to_string(),
                description: description.to_string(),
                image: image.to_string(),
                price,
            })
            .await?;
    }
    tracing::info!(items = MENU.len(), "Menu seeded");
    Ok(())
}

async fn register_once(
    store: &PgStore,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User, CommandError> {
    match AuthService::new(store).register(name, email, password).await {
        Ok(user) => Ok(user),
        Err(AuthError::UserAlreadyExists) => {
            let email = Email::parse(email).map_err(AuthError::from)?;
            store
                .get_user_by_email(&email)
                .await?
                .ok_or_else(|| CommandError::Repository(RepositoryError::NotFound))
        }
        Err(e) => Err(e.into()),
    }
}

async fn seed_franchise(store: &PgStore, admin: &User) -> Result<(), CommandError> {
    let existing = store
        .list_franchises(PageRequest::new(0, 1), FRANCHISE)
        .await?;
    if !existing.items.is_empty() {
        tracing::info!("Franchise already present, skipping");
        return Ok(());
    }

    let franchise = store.create_franchise(FRANCHISE, &[admin.id]).await?;
    store.create_store(franchise.id, STORE).await?;
    tracing::info!(franchise_id = %franchise.id, "Franchise seeded");
    Ok(())
}
