//! JWT Pizza Core - Shared domain types.
//!
//! This crate provides the types shared by the service, the CLI and the
//! integration tests:
//! - `service` - REST backend (auth, users, franchises, menu, orders)
//! - `cli` - Migrations and admin bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. The optional `postgres` feature adds `sqlx` encoding.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, roles and prices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
