//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database ping)
//!
//! # Auth
//! GET  /auth/login                      - Shop domain form
//! GET  /auth                            - Start OAuth install
//! GET  /auth/callback                   - OAuth callback
//! GET  /auth/session-token              - App Bridge bounce page
//!
//! # Embedded pages (session token required)
//! GET  /app                             - Redirect to dashboard
//! GET  /app/dashboard                   - Overview
//! GET  /app/products                    - Product table
//! GET  /app/products/{id}               - Product detail and optimization
//! GET  /app/billing                     - Plan selection
//! POST /app/billing                     - Select a plan
//! GET  /app/billing/confirm             - Billing return URL
//!
//! # JSON API (session token required)
//! GET  /api/tokens                      - Token balance
//! POST /api/optimization-prompt         - Preview the prompt
//! POST /api/optimize-product            - Run an optimization
//! GET  /api/product-version             - List versions
//! POST /api/product-version             - Append a version
//! POST /api/update-shopify-product      - Push fields to Shopify
//!
//! # Webhooks (HMAC verified)
//! POST /webhooks                        - Uninstall and privacy topics
//! ```

pub mod api;
pub mod auth;
pub mod billing;
pub mod dashboard;
pub mod health;
pub mod products;
pub mod webhooks;

use axum::{
    Router,
    extract::RawQuery,
    response::Redirect,
    routing::{get, post},
};

use crate::db::ShopUserRepository;
use crate::middleware::ShopSession;
use crate::state::AppState;

/// Build the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/", get(root))
        .merge(auth::router())
        .route("/app", get(app_index))
        .route("/app/dashboard", get(dashboard::index))
        .route("/app/products", get(products::index))
        .route("/app/products/{id}", get(products::show))
        .merge(billing::router())
        .nest("/api", api::router())
        .route("/webhooks", post(webhooks::receive))
}

/// GET / - Shopify opens the app URL with `shop` and `host`; keep them.
async fn root(RawQuery(query): RawQuery) -> Redirect {
    Redirect::to(&with_query("/app/dashboard", query.as_deref()))
}

/// GET /app - Redirect to the dashboard.
async fn app_index(RawQuery(query): RawQuery) -> Redirect {
    Redirect::to(&with_query("/app/dashboard", query.as_deref()))
}

fn with_query(path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path.to_string(),
    }
}

// =============================================================================
// Page Shell
// =============================================================================

/// Query parameters every embedded page accepts.
#[derive(Debug, Default, serde::Deserialize)]
pub struct EmbeddedQuery {
    /// Base64 host parameter App Bridge uses to locate the admin.
    pub host: Option<String>,
}

/// Data the base layout needs on every embedded page.
#[derive(Debug, Clone)]
pub struct Shell {
    pub api_key: String,
    pub shop: String,
    pub host: Option<String>,
    pub current_path: &'static str,
    /// Token balance, if it could be loaded.
    pub tokens: Option<i32>,
}

impl Shell {
    /// Build the shell for `session`, loading the token balance.
    pub async fn load(
        state: &AppState,
        session: &ShopSession,
        host: Option<String>,
        current_path: &'static str,
    ) -> Self {
        let tokens = match ShopUserRepository::new(state.pool())
            .token_balance(&session.shop)
            .await
        {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load token balance");
                None
            }
        };

        Self {
            api_key: state.shopify().api_key().to_string(),
            shop: session.shop.clone(),
            host,
            current_path,
            tokens,
        }
    }

    /// An in-app link that keeps `shop` and `host`, so a full page load can
    /// bounce for a fresh session token.
    #[must_use]
    pub fn link(&self, path: &str) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("shop", &self.shop);
        if let Some(host) = &self.host {
            query.append_pair("host", host);
        }
        let separator = if path.contains('?') { '&' } else { '?' };
        format!("{path}{separator}{}", query.finish())
    }

    /// Link to a product's detail page.
    #[must_use]
    pub fn product_link(&self, product_id: &str) -> String {
        self.link(&format!(
            "/app/products/{}",
            crate::shopify::numeric_product_id(product_id)
        ))
    }

    /// Whether `path` is the current page, for nav highlighting.
    #[must_use]
    pub fn is_current(&self, path: &str) -> bool {
        self.current_path == path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(host: Option<&str>) -> Shell {
        Shell {
            api_key: "key".to_string(),
            shop: "demo.myshopify.com".to_string(),
            host: host.map(String::from),
            current_path: "/app/products",
            tokens: Some(3),
        }
    }

    #[test]
    fn test_link_keeps_shop_and_host() {
        assert_eq!(
            shell(Some("YWRtaW4=")).link("/app/products"),
            "/app/products?shop=demo.myshopify.com&host=YWRtaW4%3D"
        );
        assert_eq!(
            shell(None).link("/app/products?after=abc"),
            "/app/products?after=abc&shop=demo.myshopify.com"
        );
    }

    #[test]
    fn test_product_link_uses_numeric_id() {
        assert_eq!(
            shell(None).product_link("gid://shopify/Product/42"),
            "/app/products/42?shop=demo.myshopify.com"
        );
    }

    #[test]
    fn test_is_current() {
        let shell = shell(None);
        assert!(shell.is_current("/app/products"));
        assert!(!shell.is_current("/app/billing"));
    }

    #[test]
    fn test_with_query() {
        assert_eq!(with_query("/app/dashboard", Some("shop=a")), "/app/dashboard?shop=a");
        assert_eq!(with_query("/app/dashboard", Some("")), "/app/dashboard");
        assert_eq!(with_query("/app/dashboard", None), "/app/dashboard");
    }
}
