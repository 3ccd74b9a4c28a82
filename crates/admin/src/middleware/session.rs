//! Session middleware configuration.
//!
//! Sessions only carry the OAuth `state` nonce between `/auth` and
//! `/auth/callback`, so they expire quickly.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer, cookie::SameSite};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AdminConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "po_session";

/// Session expiry time in seconds (1 hour).
const SESSION_EXPIRY_SECONDS: i64 = 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// The cookie is `SameSite=None` over HTTPS because the app is rendered
/// inside the Shopify admin iframe. Plain-HTTP development falls back to `Lax`.
///
/// # Errors
///
/// Returns an error if the schema or table name is rejected by the store.
pub fn create_session_layer(
    pool: &PgPool,
    config: &AdminConfig,
) -> Result<SessionManagerLayer<PostgresStore>, sqlx::Error> {
    // The session table is created by migration in the optimizer schema.
    let store = PostgresStore::new(pool.clone())
        .with_schema_name("optimizer")
        .map_err(|e| sqlx::Error::Configuration(e.into()))?
        .with_table_name("session")
        .map_err(|e| sqlx::Error::Configuration(e.into()))?;

    let is_secure = config.is_secure();
    let same_site = if is_secure { SameSite::None } else { SameSite::Lax };

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(same_site)
        .with_http_only(true)
        .with_path("/"))
}
