//! Unified error handling for handlers.
//!
//! Every handler error becomes a JSON body of the form `{"error": ...}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::llm::LlmError;
use crate::optimization::PromptError;
use crate::shopify::{AdminShopifyError, UserError};

/// Message returned when a shop has no tokens left.
pub const INSUFFICIENT_TOKENS_MESSAGE: &str = "אין מספיק טוקנים. יש לשדרג את התוכנית.";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] AdminShopifyError),

    /// LLM request failed.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or invalid session token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The shop's token balance is exhausted.
    #[error("Insufficient tokens")]
    InsufficientTokens,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PromptError> for AppError {
    fn from(err: PromptError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Shopify(AdminShopifyError::UserErrors(_) | AdminShopifyError::InvalidShop(_))
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Shopify(_) | Self::Llm(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientTokens => StatusCode::PAYMENT_REQUIRED,
        }
    }

    /// Shopify validation errors carried by this error, if any.
    #[must_use]
    pub fn user_errors(&self) -> Option<&[UserError]> {
        match self {
            Self::Shopify(AdminShopifyError::UserErrors(errors)) => Some(errors),
            _ => None,
        }
    }

    fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Client error");
        }

        let status = self.status();

        let body = match &self {
            Self::InsufficientTokens => json!({ "error": INSUFFICIENT_TOKENS_MESSAGE, "tokens": 0 }),
            Self::Shopify(AdminShopifyError::UserErrors(errors)) => json!({ "error": errors }),
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Internal(_) => json!({ "error": "Internal server error" }),
            Self::Shopify(_) => json!({ "error": "Shopify request failed" }),
            Self::Llm(_) => json!({ "error": "AI service request failed" }),
            Self::NotFound(msg) | Self::Unauthorized(msg) | Self::BadRequest(msg) => {
                json!({ "error": msg })
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Tag Sentry events with the current shop.
pub fn set_sentry_shop(shop: &str) {
    sentry::configure_scope(|scope| {
        scope.set_tag("shop", shop);
    });
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 1".to_string());
        assert_eq!(err.to_string(), "Not found: product 1");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InsufficientTokens.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(
            AppError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Llm(LlmError::Parse("bad".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Shopify(AdminShopifyError::RateLimited(2)).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(PromptError::NoFocusAreas).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_insufficient_tokens_body() {
        let (status, body) = body_json(AppError::InsufficientTokens).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["tokens"], 0);
        assert_eq!(body["error"], INSUFFICIENT_TOKENS_MESSAGE);
    }

    #[tokio::test]
    async fn test_user_errors_body_lists_errors() {
        let err = AppError::Shopify(AdminShopifyError::UserErrors(vec![UserError {
            field: Some(vec!["title".to_string()]),
            message: "Title can't be blank".to_string(),
        }]));
        assert_eq!(err.user_errors().map(<[UserError]>::len), Some(1));

        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"][0]["message"], "Title can't be blank");
        assert_eq!(body["error"][0]["field"][0], "title");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, body) = body_json(AppError::Internal("pool exhausted".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }
}
