//! Database operations for the optimizer `PostgreSQL` schema.
//!
//! ## Tables (schema `optimizer`)
//!
//! - `product_version` - Append-only history of optimized product fields
//! - `shop_user` - Plan and token balance per shop
//! - `shopify_session` - Offline Admin API access tokens
//! - `session` - tower-sessions store (OAuth state only)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p product-optimizer-cli -- migrate
//! ```

pub mod product_versions;
pub mod shop_users;
pub mod shopify_sessions;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use product_versions::{NewProductVersion, ProductVersion, ProductVersionRepository};
pub use shop_users::{ShopUser, ShopUserRepository};
pub use shopify_sessions::{ShopifySession, ShopifySessionRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options()
        .connect(database_url.expose_secret())
        .await
}

/// Pool options shared by the server and tests.
#[must_use]
pub fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
}
