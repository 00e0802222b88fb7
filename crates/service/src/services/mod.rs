//! Business logic services.
//!
//! - [`AuthService`] - Registration, password login, profile updates
//! - [`TokenService`] - Session token issue/validate/revoke
//! - [`policy`] - Authorization decisions
//! - [`FactoryClient`] - Order fulfillment at the pizza factory

pub mod auth;
pub mod factory;
pub mod policy;
pub mod tokens;

pub use auth::{AuthError, AuthService};
pub use factory::{FactoryClient, FactoryError, FactoryReceipt};
pub use policy::{Action, allow};
pub use tokens::{Claims, TokenError, TokenService};
