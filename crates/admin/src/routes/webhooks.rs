//! Shopify webhook receiver.
//!
//! Handles the uninstall topic and the mandatory privacy topics. Every
//! request must carry a valid `X-Shopify-Hmac-Sha256` over the raw body.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use tracing::instrument;

use crate::db::{ShopUserRepository, ShopifySessionRepository};
use crate::shopify::WebhookTopic;
use crate::state::AppState;

const HMAC_HEADER: &str = "x-shopify-hmac-sha256";
const TOPIC_HEADER: &str = "x-shopify-topic";
const SHOP_HEADER: &str = "x-shopify-shop-domain";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// POST /webhooks
#[instrument(skip(state, headers, body))]
pub async fn receive(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let Some(signature) = header(&headers, HMAC_HEADER) else {
        tracing::warn!("Webhook without HMAC header");
        return StatusCode::UNAUTHORIZED;
    };
    if !state.shopify().verify_webhook_hmac(&body, signature) {
        tracing::warn!("Webhook HMAC verification failed");
        return StatusCode::UNAUTHORIZED;
    }

    let topic = WebhookTopic::parse(header(&headers, TOPIC_HEADER).unwrap_or_default());
    let Some(shop) = header(&headers, SHOP_HEADER) else {
        return StatusCode::BAD_REQUEST;
    };

    tracing::info!(shop = %shop, topic = ?topic, "Webhook received");

    match topic {
        WebhookTopic::AppUninstalled => {
            if let Err(e) = ShopifySessionRepository::new(state.pool()).delete(shop).await {
                tracing::error!(error = %e, shop = %shop, "Failed to delete offline token");
                return StatusCode::INTERNAL_SERVER_ERROR;
            }
            state.forget_shop(shop).await;
        }
        WebhookTopic::ShopRedact => {
            if let Err(e) = ShopUserRepository::new(state.pool())
                .delete_shop_data(shop)
                .await
            {
                tracing::error!(error = %e, shop = %shop, "Failed to redact shop data");
                return StatusCode::INTERNAL_SERVER_ERROR;
            }
            if let Err(e) = ShopifySessionRepository::new(state.pool()).delete(shop).await {
                tracing::error!(error = %e, shop = %shop, "Failed to delete offline token");
                return StatusCode::INTERNAL_SERVER_ERROR;
            }
            state.forget_shop(shop).await;
        }
        // No customer data is stored.
        WebhookTopic::CustomersDataRequest | WebhookTopic::CustomersRedact => {}
        WebhookTopic::Other(topic) => {
            tracing::debug!(topic = %topic, "Ignoring webhook topic");
        }
    }

    StatusCode::OK
}
