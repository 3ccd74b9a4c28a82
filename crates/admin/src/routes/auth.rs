//! Install and session routes.
//!
//! Embedded pages authenticate with App Bridge session tokens. These routes
//! cover the pieces that run before a token exists: the shop login form,
//! the OAuth install flow and the bounce page that fetches a fresh token.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Query, RawQuery, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::db::ShopifySessionRepository;
use crate::filters;
use crate::shopify::{is_valid_shop_domain, normalize_shop_domain};
use crate::state::AppState;

const OAUTH_STATE_KEY: &str = "shopify_oauth_state";

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_page))
        .route("/auth", get(install))
        .route("/auth/callback", get(callback))
        .route("/auth/session-token", get(session_token_page))
}

// =============================================================================
// Templates
// =============================================================================

/// Shop domain form shown outside the admin.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub shop: String,
    pub error_message: Option<&'static str>,
}

/// Blank page that loads App Bridge so it can reload with an `id_token`.
#[derive(Template, WebTemplate)]
#[template(path = "auth/session_token.html")]
pub struct SessionTokenTemplate {
    pub api_key: String,
}

// =============================================================================
// Query Parameters
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub shop: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InstallQuery {
    pub shop: Option<String>,
}

fn login_error_message(code: &str) -> &'static str {
    match code {
        "invalid_shop" => "כתובת החנות אינה תקינה. יש להזין כתובת בסגנון my-store.myshopify.com.",
        "oauth_denied" => "ההרשאה נדחתה בשופיפיי.",
        "oauth_invalid_hmac" => "חתימת האבטחה אינה תקינה. נסה שוב.",
        "oauth_invalid_state" => "פג תוקף בקשת ההתקנה. נסה שוב.",
        "oauth_exchange_failed" => "קבלת הרשאת הגישה משופיפיי נכשלה.",
        "oauth_save_failed" => "שמירת פרטי החנות נכשלה.",
        _ => "ההתחברות נכשלה. נסה שוב.",
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// GET /auth/login - Shop domain form.
async fn login_page(Query(query): Query<LoginQuery>) -> LoginTemplate {
    LoginTemplate {
        shop: query.shop.unwrap_or_default(),
        error_message: query.error.as_deref().map(login_error_message),
    }
}

/// GET /auth?shop=... - Start the OAuth install.
#[instrument(skip(state, session))]
async fn install(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<InstallQuery>,
) -> Response {
    let Some(shop) = query.shop.as_deref().and_then(normalize_shop_domain) else {
        return Redirect::to("/auth/login?error=invalid_shop").into_response();
    };

    let nonce = uuid::Uuid::new_v4().to_string();
    if let Err(e) = session.insert(OAUTH_STATE_KEY, &nonce).await {
        tracing::error!(error = %e, "Failed to store OAuth state");
        return Redirect::to("/auth/login?error=oauth_failed").into_response();
    }

    let redirect_uri = state.config().url_for("/auth/callback");
    let url = state
        .shopify()
        .authorization_url(&shop, &redirect_uri, &nonce);

    tracing::info!(shop = %shop, "Starting OAuth install");
    Redirect::to(&url).into_response()
}

/// GET /auth/callback - OAuth redirect from Shopify.
///
/// Verifies the HMAC and state nonce, exchanges the code for an offline
/// token, stores it and opens the app inside the admin.
#[instrument(skip(state, session, query))]
async fn callback(
    State(state): State<AppState>,
    session: Session,
    RawQuery(query): RawQuery,
) -> Response {
    let params: Vec<(String, String)> =
        url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .into_owned()
            .collect();
    let param = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    if param("error").is_some() {
        tracing::warn!(error = ?param("error_description"), "OAuth denied");
        return Redirect::to("/auth/login?error=oauth_denied").into_response();
    }

    if !state.shopify().verify_oauth_hmac(&params) {
        tracing::warn!("OAuth callback HMAC verification failed");
        return Redirect::to("/auth/login?error=oauth_invalid_hmac").into_response();
    }

    let stored: Option<String> = session.remove(OAUTH_STATE_KEY).await.ok().flatten();
    let state_matches = matches!((stored.as_deref(), param("state")), (Some(a), Some(b)) if a == b);
    if !state_matches {
        tracing::warn!("OAuth state mismatch");
        return Redirect::to("/auth/login?error=oauth_invalid_state").into_response();
    }

    let (Some(shop), Some(code)) = (param("shop"), param("code")) else {
        return Redirect::to("/auth/login?error=oauth_failed").into_response();
    };
    if !is_valid_shop_domain(shop) {
        return Redirect::to("/auth/login?error=invalid_shop").into_response();
    }

    let shopify_session = match state.shopify().exchange_code(shop, code).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, shop = %shop, "OAuth code exchange failed");
            return Redirect::to("/auth/login?error=oauth_exchange_failed").into_response();
        }
    };

    if let Err(e) = ShopifySessionRepository::new(state.pool())
        .save(&shopify_session)
        .await
    {
        tracing::error!(error = %e, shop = %shop, "Failed to save offline token");
        return Redirect::to("/auth/login?error=oauth_save_failed").into_response();
    }
    state
        .remember_token(shop, shopify_session.access_token.clone())
        .await;

    tracing::info!(shop = %shop, scopes = ?shopify_session.scopes, "App installed");
    Redirect::to(&format!(
        "https://{shop}/admin/apps/{}",
        state.shopify().api_key()
    ))
    .into_response()
}

/// GET /auth/session-token - App Bridge bounce page.
///
/// App Bridge reads `shopify-reload` from the URL and reloads that path with
/// a fresh `id_token`.
async fn session_token_page(State(state): State<AppState>) -> SessionTokenTemplate {
    SessionTokenTemplate {
        api_key: state.shopify().api_key().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_error_messages() {
        assert_ne!(
            login_error_message("invalid_shop"),
            login_error_message("unknown")
        );
        assert_eq!(
            login_error_message("something_else"),
            login_error_message("unknown")
        );
    }

    #[test]
    fn test_login_template_renders_shop() {
        let page = LoginTemplate {
            shop: "demo.myshopify.com".to_string(),
            error_message: Some(login_error_message("invalid_shop")),
        };
        let html = page.render().unwrap();
        assert!(html.contains("value=\"demo.myshopify.com\""));
        assert!(html.contains("my-store.myshopify.com"));
    }
}
