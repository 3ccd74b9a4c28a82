//! Session-token authentication for embedded requests.
//!
//! Every `/app/*` and `/api/*` request carries a Shopify session token,
//! either as `Authorization: Bearer <jwt>` (App Bridge `fetch`) or as the
//! `id_token` query parameter (document loads after the bounce page).

use axum::{
    Json,
    extract::{FromRequestParts, OriginalUri},
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;

use crate::error::set_sentry_shop;
use crate::shopify::{SessionTokenClaims, is_valid_shop_domain};
use crate::state::AppState;

/// Header telling App Bridge to fetch a fresh session token and retry.
pub const RETRY_INVALID_SESSION_HEADER: &str = "x-shopify-retry-invalid-session-request";

/// Extractor that requires a valid session token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(session: ShopSession) -> impl IntoResponse {
///     format!("Hello, {}!", session.shop)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ShopSession {
    /// Shop domain from the token's `dest` claim.
    pub shop: String,
    /// The raw token, kept for token exchange.
    pub token: String,
    pub claims: SessionTokenClaims,
}

/// Error returned when a request has no valid session token.
#[derive(Debug)]
pub enum ShopAuthRejection {
    /// Bounce through App Bridge to obtain a token, then reload `reload`.
    Bounce { shop: String, reload: String },
    /// No shop is known; ask the merchant for one.
    RedirectToLogin,
    /// API request without a valid token.
    Unauthorized(String),
}

impl IntoResponse for ShopAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Bounce { shop, reload } => Redirect::to(&bounce_url(&shop, &reload)).into_response(),
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized(message) => {
                let mut response =
                    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response();
                response.headers_mut().insert(
                    RETRY_INVALID_SESSION_HEADER,
                    HeaderValue::from_static("1"),
                );
                response
            }
        }
    }
}

impl FromRequestParts<AppState> for ShopSession {
    type Rejection = ShopAuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Nested routers see a stripped path
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.clone(), |original| original.0.clone());
        let is_api = uri.path().starts_with("/api/");
        let query = query_pairs(uri.query());

        let token = bearer_token(parts).or_else(|| {
            query
                .iter()
                .find(|(k, _)| k == "id_token")
                .map(|(_, v)| v.clone())
        });

        let verified = token.as_deref().map(|t| state.shopify().verify_session_token(t));

        match (token, verified) {
            (Some(token), Some(Ok((shop, claims)))) => {
                set_sentry_shop(&shop);
                Ok(Self {
                    shop,
                    token,
                    claims,
                })
            }
            (_, verified) => {
                if let Some(Err(e)) = verified {
                    tracing::debug!(error = %e, "Rejected session token");
                }

                if is_api {
                    return Err(ShopAuthRejection::Unauthorized(
                        "Missing or invalid session token".to_string(),
                    ));
                }

                let shop = query
                    .iter()
                    .find(|(k, _)| k == "shop")
                    .map(|(_, v)| v.to_ascii_lowercase())
                    .filter(|s| is_valid_shop_domain(s));

                match shop {
                    Some(shop) => Err(ShopAuthRejection::Bounce {
                        shop,
                        reload: reload_target(uri.path(), &query),
                    }),
                    None => Err(ShopAuthRejection::RedirectToLogin),
                }
            }
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn query_pairs(query: Option<&str>) -> Vec<(String, String)> {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// The current path and query without any stale `id_token`.
fn reload_target(path: &str, query: &[(String, String)]) -> String {
    let kept: Vec<&(String, String)> = query.iter().filter(|(k, _)| k != "id_token").collect();
    if kept.is_empty() {
        return path.to_string();
    }
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish();
    format!("{path}?{encoded}")
}

/// URL of the App Bridge bounce page.
#[must_use]
pub fn bounce_url(shop: &str, reload: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("shop", shop)
        .append_pair("shopify-reload", reload)
        .finish();
    format!("/auth/session-token?{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_decodes() {
        let pairs = query_pairs(Some("shop=demo.myshopify.com&host=YWRtaW4%3D"));
        assert_eq!(pairs[0], ("shop".to_string(), "demo.myshopify.com".to_string()));
        assert_eq!(pairs[1].1, "YWRtaW4=");
        assert!(query_pairs(None).is_empty());
    }

    #[test]
    fn test_reload_target_drops_id_token() {
        let query = query_pairs(Some("shop=demo.myshopify.com&id_token=old&page=2"));
        assert_eq!(
            reload_target("/app/products", &query),
            "/app/products?shop=demo.myshopify.com&page=2"
        );
        assert_eq!(reload_target("/app", &[]), "/app");
    }

    #[test]
    fn test_bounce_url_encodes_reload() {
        let url = bounce_url("demo.myshopify.com", "/app/products?page=2");
        assert_eq!(
            url,
            "/auth/session-token?shop=demo.myshopify.com&shopify-reload=%2Fapp%2Fproducts%3Fpage%3D2"
        );
    }

    #[test]
    fn test_unauthorized_sets_retry_header() {
        let response = ShopAuthRejection::Unauthorized("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(RETRY_INVALID_SESSION_HEADER).and_then(|v| v.to_str().ok()),
            Some("1")
        );
    }

    #[test]
    fn test_login_redirect() {
        let response = ShopAuthRejection::RedirectToLogin.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").and_then(|v| v.to_str().ok()),
            Some("/auth/login")
        );
    }
}
