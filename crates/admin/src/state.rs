//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::SecretString;
use sqlx::PgPool;
use tracing::instrument;

use crate::config::AdminConfig;
use crate::db::ShopifySessionRepository;
use crate::error::AppError;
use crate::llm::{LlmClient, LlmError};
use crate::shopify::{AdminClient, AdminShopifyError, ShopifyApp};

/// How long a resolved offline token stays cached.
const TOKEN_CACHE_TTL: Duration = Duration::from_secs(600);

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to build Shopify client: {0}")]
    Shopify(#[from] AdminShopifyError),
    #[error("failed to build LLM client: {0}")]
    Llm(#[from] LlmError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    shopify: ShopifyApp,
    llm: LlmClient,
    offline_tokens: Cache<String, SecretString>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an outbound HTTP client cannot be built.
    pub fn new(config: AdminConfig, pool: PgPool) -> Result<Self, StateError> {
        let shopify = ShopifyApp::new(&config.shopify)?;
        let llm = LlmClient::new(&config.llm)?;
        let offline_tokens = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(TOKEN_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                shopify,
                llm,
                offline_tokens,
            }),
        })
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the app-level Shopify credentials.
    #[must_use]
    pub fn shopify(&self) -> &ShopifyApp {
        &self.inner.shopify
    }

    /// Get a reference to the LLM client.
    #[must_use]
    pub fn llm(&self) -> &LlmClient {
        &self.inner.llm
    }

    /// Resolve the offline access token for `shop`.
    ///
    /// Looks in the cache, then the database, and finally exchanges
    /// `session_token` for a new offline token, which is persisted.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` if no token is stored and no session
    /// token is available to exchange, or the underlying error if the
    /// exchange or the database fails.
    #[instrument(skip(self, session_token))]
    pub async fn offline_token(
        &self,
        shop: &str,
        session_token: Option<&str>,
    ) -> Result<SecretString, AppError> {
        if let Some(token) = self.inner.offline_tokens.get(shop).await {
            return Ok(token);
        }

        let repo = ShopifySessionRepository::new(self.pool());
        if let Some(stored) = repo.get_by_shop(shop).await? {
            self.inner
                .offline_tokens
                .insert(shop.to_string(), stored.access_token.clone())
                .await;
            return Ok(stored.access_token);
        }

        let session_token = session_token.ok_or_else(|| {
            AppError::Unauthorized(format!("No offline token stored for {shop}"))
        })?;

        let session = self
            .inner
            .shopify
            .exchange_session_token(shop, session_token)
            .await?;
        repo.save(&session).await?;
        self.inner
            .offline_tokens
            .insert(shop.to_string(), session.access_token.clone())
            .await;

        Ok(session.access_token)
    }

    /// An Admin API client for `shop`, resolving its offline token first.
    ///
    /// # Errors
    ///
    /// See [`AppState::offline_token`].
    pub async fn admin_client(
        &self,
        shop: &str,
        session_token: Option<&str>,
    ) -> Result<AdminClient, AppError> {
        let token = self.offline_token(shop, session_token).await?;
        Ok(self.inner.shopify.admin_client(shop, token))
    }

    /// Remember a freshly obtained offline token.
    pub async fn remember_token(&self, shop: &str, token: SecretString) {
        self.inner.offline_tokens.insert(shop.to_string(), token).await;
    }

    /// Drop any cached offline token for `shop`.
    pub async fn forget_shop(&self, shop: &str) {
        self.inner.offline_tokens.invalidate(shop).await;
    }
}
