//! Shopify Admin API GraphQL client.
//!
//! An [`AdminClient`] is bound to one shop and its offline access token.
//! Handlers get one from `AppState::admin_client`, which resolves the token.

use std::sync::Arc;

use graphql_client::GraphQLQuery;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{AdminShopifyError, GraphQLError, GraphQLErrorLocation};

mod billing;
mod conversions;
mod products;
pub mod queries;

pub use products::ProductUpdateInput;
pub use queries::product_update::UpdatedProduct;

/// Shopify Admin API GraphQL client for a single shop.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    shop: String,
    api_version: String,
    access_token: SecretString,
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
    #[serde(default)]
    locations: Vec<GraphQLErrorLocationResponse>,
    #[serde(default)]
    path: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorLocationResponse {
    line: i64,
    column: i64,
}

impl AdminClient {
    /// Create a client for `shop` using an already configured HTTP client.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        shop: impl Into<String>,
        api_version: impl Into<String>,
        access_token: SecretString,
    ) -> Self {
        Self {
            inner: Arc::new(AdminClientInner {
                client,
                shop: shop.into(),
                api_version: api_version.into(),
                access_token,
            }),
        }
    }

    /// Shop domain this client talks to.
    #[must_use]
    pub fn shop(&self) -> &str {
        &self.inner.shop
    }

    fn endpoint(&self) -> String {
        format!(
            "https://{}/admin/api/{}/graphql.json",
            self.inner.shop, self.inner.api_version
        )
    }

    // =========================================================================
    // GraphQL Execution
    // =========================================================================

    /// Execute a GraphQL operation.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, AdminShopifyError> {
        let body = Q::build_query(variables);

        let response = self
            .inner
            .client
            .post(self.endpoint())
            .header("X-Shopify-Access-Token", self.inner.access_token.expose_secret())
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split('.').next())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(AdminShopifyError::RateLimited(retry_after));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AdminShopifyError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AdminShopifyError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let graphql_response: GraphQLResponse<Q::ResponseData> = response.json().await?;
        into_data(graphql_response)
    }
}

/// Unwrap a GraphQL response, turning top-level errors into an error.
fn into_data<T>(response: GraphQLResponse<T>) -> Result<T, AdminShopifyError> {
    if let Some(errors) = response.errors
        && !errors.is_empty()
    {
        let converted_errors: Vec<GraphQLError> = errors
            .into_iter()
            .map(|e| GraphQLError {
                message: e.message,
                locations: e
                    .locations
                    .into_iter()
                    .map(|l| GraphQLErrorLocation {
                        line: l.line,
                        column: l.column,
                    })
                    .collect(),
                path: e.path,
            })
            .collect();
        return Err(AdminShopifyError::GraphQL(converted_errors));
    }

    response
        .data
        .ok_or_else(|| AdminShopifyError::GraphQL(vec![GraphQLError::message("No data in response")]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_client_is_clone_send_sync() {
        fn assert_traits<T: Clone + Send + Sync>() {}
        assert_traits::<AdminClient>();
    }

    #[test]
    fn test_endpoint_uses_shop_and_version() {
        let client = AdminClient::new(
            reqwest::Client::new(),
            "demo.myshopify.com",
            "2025-01",
            SecretString::from("shpat_x"),
        );
        assert_eq!(
            client.endpoint(),
            "https://demo.myshopify.com/admin/api/2025-01/graphql.json"
        );
        assert_eq!(client.shop(), "demo.myshopify.com");
    }

    #[test]
    fn test_into_data_surfaces_graphql_errors() {
        let response: GraphQLResponse<serde_json::Value> = serde_json::from_str(
            r#"{"data": null, "errors": [{"message": "Throttled", "locations": [{"line": 1, "column": 2}]}]}"#,
        )
        .expect("decode");

        let err = into_data(response).expect_err("errors present");
        assert_eq!(err.to_string(), "GraphQL errors: Throttled");
    }

    #[test]
    fn test_into_data_requires_data() {
        let response: GraphQLResponse<serde_json::Value> =
            serde_json::from_str(r#"{"data": null}"#).expect("decode");
        assert!(matches!(into_data(response), Err(AdminShopifyError::GraphQL(_))));
    }

    #[test]
    fn test_into_data_returns_data() {
        let response: GraphQLResponse<serde_json::Value> =
            serde_json::from_str(r#"{"data": {"ok": true}, "errors": []}"#).expect("decode");
        let data = into_data(response).expect("data");
        assert_eq!(data["ok"], true);
    }
}
