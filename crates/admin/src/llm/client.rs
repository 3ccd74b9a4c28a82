//! HTTP client for the chat completions endpoint.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::config::LlmConfig;

use super::error::{ApiErrorResponse, LlmError};
use super::types::{ChatMessage, ChatRequest, ChatResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Chat completions client.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<LlmClientInner>,
}

struct LlmClientInner {
    client: reqwest::Client,
    model: String,
    api_url: String,
}

impl LlmClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Config` if the API key is not a valid header value
    /// or the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
            .map_err(|_| LlmError::Config("API key contains invalid header characters".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(LlmClientInner {
                client,
                model: config.model.clone(),
                api_url: config.api_url.clone(),
            }),
        })
    }

    /// Model identifier sent with each request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.inner.model
    }

    /// Send a single user prompt and return the reply text.
    ///
    /// A structurally unexpected success response yields an empty string.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the endpoint responds with a
    /// non-success status, or the body is not JSON.
    #[instrument(skip(self, prompt), fields(model = %self.inner.model, prompt_len = prompt.len()))]
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: self.inner.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
        };

        let response = self
            .inner
            .client
            .post(&self.inner.api_url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_status(status, response).await);
        }

        let body = response.text().await?;
        let parsed = parse_completion(&body)?;
        if let Some(usage) = parsed.usage() {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion usage"
            );
        }

        Ok(parsed.content().to_string())
    }

    /// Map an error status code to a typed error.
    async fn handle_error_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> LlmError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return LlmError::RateLimited(retry_after);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return LlmError::Unauthorized("Invalid API key".to_string());
        }

        match response.text().await {
            Ok(body) => api_error_from_body(status, &body),
            Err(e) => LlmError::Http(e),
        }
    }
}

/// Parse a success body.
fn parse_completion(body: &str) -> Result<ChatResponse, LlmError> {
    serde_json::from_str(body)
        .map_err(|e| LlmError::Parse(format!("Failed to parse response: {e}")))
}

/// Build an API error from an error body, falling back to the raw text.
fn api_error_from_body(status: reqwest::StatusCode, body: &str) -> LlmError {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_error) => LlmError::Api {
            error_type: api_error
                .error
                .error_type
                .unwrap_or_else(|| status.as_u16().to_string()),
            message: api_error.error.message,
        },
        Err(_) => LlmError::Api {
            error_type: status.as_u16().to_string(),
            message: body.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    #[test]
    fn test_parse_completion_invalid_json() {
        let result = parse_completion("<html>bad gateway</html>");
        assert!(matches!(result, Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_parse_completion_missing_content() {
        let response = parse_completion(r#"{"choices":[{"message":{"role":"assistant"}}]}"#)
            .expect("parse");
        assert_eq!(response.content(), "");
    }

    #[test]
    fn test_parse_completion_unexpected_shapes() {
        for body in [
            r#"{"choices":null}"#,
            r#"{"choices":[{"message":{"content":42}}]}"#,
        ] {
            let response = parse_completion(body).expect("parse");
            assert_eq!(response.content(), "", "body: {body}");
        }
    }

    #[test]
    fn test_api_error_from_json_body() {
        let body = r#"{"error":{"message":"context too long","type":"invalid_request_error"}}"#;
        let err = api_error_from_body(reqwest::StatusCode::BAD_REQUEST, body);
        assert!(matches!(
            err,
            LlmError::Api { ref error_type, ref message }
                if error_type == "invalid_request_error" && message == "context too long"
        ));
    }

    #[test]
    fn test_api_error_from_plain_body() {
        let err = api_error_from_body(reqwest::StatusCode::SERVICE_UNAVAILABLE, "upstream down");
        assert_eq!(err.to_string(), "API error (503): upstream down");
    }

    #[test]
    fn test_new_rejects_invalid_header_key() {
        let config = LlmConfig {
            api_key: SecretString::from("bad\nkey"),
            model: "m".to_string(),
            api_url: "https://example.test/v1/chat/completions".to_string(),
        };
        assert!(matches!(LlmClient::new(&config), Err(LlmError::Config(_))));
    }

    #[test]
    fn test_llm_client_is_clone_send_sync() {
        fn assert_traits<T: Clone + Send + Sync>() {}
        assert_traits::<LlmClient>();
    }
}
