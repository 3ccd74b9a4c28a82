//! App-level Shopify credentials: OAuth, token exchange and HMAC checks.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::instrument;

use crate::config::ShopifyAppConfig;
use crate::db::ShopifySession;

use super::{
    AdminClient, AdminShopifyError, is_valid_shop_domain,
    session_token::{SessionTokenClaims, SessionTokenError, SessionTokenVerifier},
};

type HmacSha256 = Hmac<Sha256>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TOKEN_EXCHANGE_GRANT: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
const ID_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:id_token";
const OFFLINE_TOKEN_TYPE: &str = "urn:shopify:params:oauth:token-type:offline-access-token";

/// Webhook topics the app handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookTopic {
    AppUninstalled,
    CustomersDataRequest,
    CustomersRedact,
    ShopRedact,
    Other(String),
}

impl WebhookTopic {
    /// Parse the `X-Shopify-Topic` header value.
    #[must_use]
    pub fn parse(topic: &str) -> Self {
        match topic.trim().to_ascii_lowercase().as_str() {
            "app/uninstalled" => Self::AppUninstalled,
            "customers/data_request" => Self::CustomersDataRequest,
            "customers/redact" => Self::CustomersRedact,
            "shop/redact" => Self::ShopRedact,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Access token response from Shopify.
#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    #[serde(default)]
    scope: String,
}

#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'static str,
    subject_token: &'a str,
    subject_token_type: &'static str,
    requested_token_type: &'static str,
}

/// The app's Shopify credentials and the HTTP client shared by all shops.
#[derive(Clone)]
pub struct ShopifyApp {
    inner: Arc<ShopifyAppInner>,
}

struct ShopifyAppInner {
    http: reqwest::Client,
    api_key: String,
    api_secret: SecretString,
    api_version: String,
    scopes: Vec<String>,
    session_tokens: SessionTokenVerifier,
}

impl ShopifyApp {
    /// Create the app from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ShopifyAppConfig) -> Result<Self, AdminShopifyError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            inner: Arc::new(ShopifyAppInner {
                http,
                api_key: config.api_key.clone(),
                api_secret: config.api_secret.clone(),
                api_version: config.api_version.clone(),
                scopes: config.scopes.clone(),
                session_tokens: SessionTokenVerifier::new(&config.api_key, &config.api_secret),
            }),
        })
    }

    /// Public API key (client ID), embedded in pages for App Bridge.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.inner.api_key
    }

    /// Admin API version.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.inner.api_version
    }

    /// An Admin API client for `shop`.
    #[must_use]
    pub fn admin_client(&self, shop: &str, access_token: SecretString) -> AdminClient {
        AdminClient::new(
            self.inner.http.clone(),
            shop,
            self.inner.api_version.clone(),
            access_token,
        )
    }

    /// Verify a session token and return its shop.
    ///
    /// # Errors
    ///
    /// Returns a `SessionTokenError` if the token is not valid for this app.
    pub fn verify_session_token(
        &self,
        token: &str,
    ) -> Result<(String, SessionTokenClaims), SessionTokenError> {
        self.inner.session_tokens.verify(token)
    }

    // =========================================================================
    // OAuth Flow
    // =========================================================================

    /// URL that starts an OAuth install for `shop`.
    #[must_use]
    pub fn authorization_url(&self, shop: &str, redirect_uri: &str, state: &str) -> String {
        let scope = self.inner.scopes.join(",");
        format!(
            "https://{}/admin/oauth/authorize?client_id={}&scope={}&redirect_uri={}&state={}",
            shop,
            urlencoding::encode(&self.inner.api_key),
            urlencoding::encode(&scope),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        )
    }

    /// Exchange an OAuth authorization code for an offline access token.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::OAuth` if Shopify rejects the code.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(
        &self,
        shop: &str,
        code: &str,
    ) -> Result<ShopifySession, AdminShopifyError> {
        ensure_shop(shop)?;
        let url = format!("https://{shop}/admin/oauth/access_token");

        let params = [
            ("client_id", self.inner.api_key.as_str()),
            ("client_secret", self.inner.api_secret.expose_secret()),
            ("code", code),
        ];

        let response = self.inner.http.post(&url).form(&params).send().await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AdminShopifyError::OAuth(format!("Token exchange failed: {text}")));
        }

        let token: AccessTokenResponse = response.json().await?;
        Ok(into_session(shop, token))
    }

    /// Exchange a session token for an offline access token.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::TokenExchange` if Shopify rejects the
    /// exchange (for example when the app is not installed on the shop).
    #[instrument(skip(self, session_token))]
    pub async fn exchange_session_token(
        &self,
        shop: &str,
        session_token: &str,
    ) -> Result<ShopifySession, AdminShopifyError> {
        ensure_shop(shop)?;
        let url = format!("https://{shop}/admin/oauth/access_token");

        let body = TokenExchangeRequest {
            client_id: &self.inner.api_key,
            client_secret: self.inner.api_secret.expose_secret(),
            grant_type: TOKEN_EXCHANGE_GRANT,
            subject_token: session_token,
            subject_token_type: ID_TOKEN_TYPE,
            requested_token_type: OFFLINE_TOKEN_TYPE,
        };

        let response = self.inner.http.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AdminShopifyError::TokenExchange(format!("{status}: {text}")));
        }

        let token: AccessTokenResponse = response.json().await?;
        tracing::info!(shop = %shop, "Obtained offline access token");
        Ok(into_session(shop, token))
    }

    // =========================================================================
    // HMAC verification
    // =========================================================================

    /// Verify the `hmac` parameter of an OAuth redirect.
    ///
    /// The message is every other parameter except `signature`, sorted by key
    /// and joined as `key=value` pairs with `&`.
    #[must_use]
    pub fn verify_oauth_hmac(&self, params: &[(String, String)]) -> bool {
        verify_query_hmac(params, self.inner.api_secret.expose_secret())
    }

    /// Verify the `X-Shopify-Hmac-Sha256` header of a webhook.
    #[must_use]
    pub fn verify_webhook_hmac(&self, body: &[u8], header: &str) -> bool {
        verify_body_hmac(body, header, self.inner.api_secret.expose_secret())
    }
}

impl std::fmt::Debug for ShopifyApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyApp")
            .field("api_key", &self.inner.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("api_version", &self.inner.api_version)
            .field("scopes", &self.inner.scopes)
            .finish_non_exhaustive()
    }
}

fn ensure_shop(shop: &str) -> Result<(), AdminShopifyError> {
    if is_valid_shop_domain(shop) {
        Ok(())
    } else {
        Err(AdminShopifyError::InvalidShop(shop.to_string()))
    }
}

fn into_session(shop: &str, token: AccessTokenResponse) -> ShopifySession {
    ShopifySession {
        shop: shop.to_string(),
        access_token: SecretString::from(token.access_token),
        scopes: token
            .scope
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        obtained_at: chrono::Utc::now().timestamp(),
    }
}

fn verify_query_hmac(params: &[(String, String)], secret: &str) -> bool {
    let Some(provided) = params
        .iter()
        .find(|(k, _)| k == "hmac")
        .and_then(|(_, v)| hex::decode(v).ok())
    else {
        return false;
    };

    let mut pairs: Vec<&(String, String)> = params
        .iter()
        .filter(|(k, _)| k != "hmac" && k != "signature")
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let message = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(message.as_bytes());
    mac.verify_slice(&provided).is_ok()
}

fn verify_body_hmac(body: &[u8], header: &str, secret: &str) -> bool {
    let Ok(provided) = BASE64.decode(header.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}
