//! Shopify integration: Admin API client, app credentials, session tokens.
//!
//! # Architecture
//!
//! - [`ShopifyApp`] holds the app's API key and secret. It handles OAuth
//!   installs, token exchange, HMAC checks and session-token verification.
//! - [`AdminClient`] talks to the Admin GraphQL API for one shop using that
//!   shop's offline access token.
//! - Operations implement `graphql_client::GraphQLQuery` by hand in
//!   `admin::queries`; responses are converted into [`types`].

mod admin;
mod app;
pub mod session_token;
pub mod types;

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

pub use admin::{AdminClient, ProductUpdateInput, UpdatedProduct};
pub use app::{ShopifyApp, WebhookTopic};
pub use session_token::{SessionTokenClaims, SessionTokenError};
pub use types::*;

static SHOP_DOMAIN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9-]*\.myshopify\.com$").ok());

/// Whether `shop` is a `*.myshopify.com` domain.
#[must_use]
pub fn is_valid_shop_domain(shop: &str) -> bool {
    SHOP_DOMAIN.as_ref().is_some_and(|re| re.is_match(shop))
}

/// Normalize user input to a shop domain.
///
/// Accepts `demo`, `demo.myshopify.com` or `https://demo.myshopify.com/`.
#[must_use]
pub fn normalize_shop_domain(input: &str) -> Option<String> {
    let trimmed = input.trim().to_ascii_lowercase();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(&trimmed);
    let host = without_scheme.split('/').next().unwrap_or_default();

    let shop = if host.contains('.') {
        host.to_string()
    } else {
        format!("{host}.myshopify.com")
    };

    is_valid_shop_domain(&shop).then_some(shop)
}

/// Errors that can occur when interacting with Shopify.
#[derive(Debug, Error)]
pub enum AdminShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A mutation rejected its input.
    #[error("User errors: {}", format_user_errors(.0))]
    UserErrors(Vec<UserError>),

    /// Unexpected HTTP status.
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// OAuth authorization-code exchange failed.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// Session-token exchange failed.
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// Not a `*.myshopify.com` domain.
    #[error("Invalid shop domain: {0}")]
    InvalidShop(String),
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

impl GraphQLError {
    /// An error with only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: vec![],
            path: vec![],
        }
    }
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}

fn format_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_error_formatting() {
        let errors = vec![
            GraphQLError::message("Field not found"),
            GraphQLError::message("Invalid ID"),
        ];
        let err = AdminShopifyError::GraphQL(errors);
        assert_eq!(err.to_string(), "GraphQL errors: Field not found; Invalid ID");
    }

    #[test]
    fn test_rate_limited_error() {
        let err = AdminShopifyError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }

    #[test]
    fn test_user_errors_formatting() {
        let err = AdminShopifyError::UserErrors(vec![UserError {
            field: Some(vec!["title".to_string()]),
            message: "is too long".to_string(),
        }]);
        assert_eq!(err.to_string(), "User errors: title: is too long");
    }

    #[test]
    fn test_shop_domain_validation() {
        assert!(is_valid_shop_domain("demo-store.myshopify.com"));
        assert!(!is_valid_shop_domain("demo.myshopify.com.evil.com"));
        assert!(!is_valid_shop_domain("-demo.myshopify.com"));
        assert!(!is_valid_shop_domain("demo.example.com"));
        assert!(!is_valid_shop_domain(""));
    }

    #[test]
    fn test_normalize_shop_domain() {
        assert_eq!(normalize_shop_domain("demo").as_deref(), Some("demo.myshopify.com"));
        assert_eq!(
            normalize_shop_domain(" https://Demo.myshopify.com/admin ").as_deref(),
            Some("demo.myshopify.com")
        );
        assert_eq!(normalize_shop_domain("demo.example.com"), None);
        assert_eq!(normalize_shop_domain("bad shop"), None);
    }
}
