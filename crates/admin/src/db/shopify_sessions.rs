//! Offline Admin API access tokens, one per installed shop.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;

// =============================================================================
// Types
// =============================================================================

/// A shop's offline access token.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ShopifySession {
    /// Shop domain (e.g., your-store.myshopify.com).
    pub shop: String,
    /// Offline access token (redacted in debug output).
    pub access_token: SecretString,
    /// Granted scopes.
    pub scopes: Vec<String>,
    /// Unix timestamp when token was obtained.
    pub obtained_at: i64,
}

impl std::fmt::Debug for ShopifySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifySession")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Internal row type for `PostgreSQL` queries.
#[derive(Debug, sqlx::FromRow)]
struct ShopifySessionRow {
    shop: String,
    access_token: String,
    scope: String,
    obtained_at: i64,
}

impl From<ShopifySessionRow> for ShopifySession {
    fn from(row: ShopifySessionRow) -> Self {
        let scopes = row
            .scope
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            shop: row.shop,
            access_token: SecretString::from(row.access_token),
            scopes,
            obtained_at: row.obtained_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for stored offline tokens.
pub struct ShopifySessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShopifySessionRepository<'a> {
    /// Create a new session repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the stored token for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn get_by_shop(&self, shop: &str) -> Result<Option<ShopifySession>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopifySessionRow>(
            r"
            SELECT shop, access_token, scope, obtained_at
            FROM optimizer.shopify_session
            WHERE shop = $1
            ",
        )
        .bind(shop)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ShopifySession::from))
    }

    /// Save or replace a shop's token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, session), fields(shop = %session.shop))]
    pub async fn save(&self, session: &ShopifySession) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO optimizer.shopify_session (shop, access_token, scope, obtained_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (shop) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                scope = EXCLUDED.scope,
                obtained_at = EXCLUDED.obtained_at,
                updated_at = NOW()
            ",
        )
        .bind(&session.shop)
        .bind(session.access_token.expose_secret())
        .bind(session.scopes.join(","))
        .bind(session.obtained_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete a shop's token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, shop: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM optimizer.shopify_session WHERE shop = $1")
            .bind(shop)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
