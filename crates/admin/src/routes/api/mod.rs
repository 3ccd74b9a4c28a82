//! JSON API used by the embedded pages.
//!
//! Every handler takes a [`ShopSession`], so requests need a valid session
//! token. Errors are `{"error": ...}` bodies built by [`AppError`].

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use product_optimizer_core::{Score, SubscriptionPlan, VersionStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use crate::db::{NewProductVersion, ProductVersion, ProductVersionRepository, ShopUserRepository};
use crate::error::AppError;
use crate::middleware::ShopSession;
use crate::optimization::{FocusArea, OptimizationSettings, generate_optimization_prompt};
use crate::services::{BillingService, OptimizerService};
use crate::shopify::{ProductUpdateInput, UpdatedProduct, is_valid_product_id, product_gid};
use crate::state::AppState;

/// Build the API router, nested under `/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tokens", get(tokens))
        .route("/optimization-prompt", post(optimization_prompt))
        .route("/optimize-product", post(optimize_product))
        .route("/product-version", get(list_versions).post(create_version))
        .route("/update-shopify-product", post(update_shopify_product))
}

// =============================================================================
// Request Types
// =============================================================================

/// Tags sent either as a list or as one comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Joined(String),
}

impl TagsInput {
    /// Trimmed, non-empty tags. A list entry containing a comma becomes
    /// several tags.
    #[must_use]
    pub fn into_tags(self) -> Vec<String> {
        let raw = match self {
            Self::List(tags) => tags,
            Self::Joined(joined) => vec![joined],
        };
        raw.iter()
            .flat_map(|t| t.split(','))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    }
}

impl Default for TagsInput {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

fn require_product_id(id: &str) -> Result<String, AppError> {
    if is_valid_product_id(id) {
        Ok(product_gid(id))
    } else {
        Err(AppError::BadRequest(format!("Invalid product id: {id}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRequest {
    pub product_id: String,
    #[serde(default)]
    pub settings: OptimizationSettings,
}

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    pub prompt: String,
    #[serde(default)]
    pub fields: Vec<FocusArea>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionQuery {
    pub product_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVersionRequest {
    pub product_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: TagsInput,
    #[serde(default)]
    pub score: Score,
    pub status: VersionStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub product_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: TagsInput,
}

impl UpdateProductRequest {
    /// Shopify update with empty fields left unchanged.
    fn into_update(self) -> ProductUpdateInput {
        let non_empty = |s: String| Some(s).filter(|s| !s.trim().is_empty());
        let tags = self.tags.into_tags();
        ProductUpdateInput {
            title: non_empty(self.title).map(|t| t.trim().to_string()),
            description_html: non_empty(self.description),
            tags: Some(tags).filter(|t| !t.is_empty()),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct TokensResponse {
    pub tokens: i32,
    pub plan: Option<SubscriptionPlan>,
}

#[derive(Debug, Serialize)]
pub struct VersionsResponse {
    pub versions: Vec<ProductVersion>,
}

#[derive(Debug, Serialize)]
pub struct UpdateProductResponse {
    pub success: bool,
    pub product: UpdatedProduct,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/tokens
#[instrument(skip(state, session), fields(shop = %session.shop))]
async fn tokens(
    session: ShopSession,
    State(state): State<AppState>,
) -> Result<Json<TokensResponse>, AppError> {
    let user = ShopUserRepository::new(state.pool())
        .get_by_shop(&session.shop)
        .await?;

    Ok(Json(TokensResponse {
        tokens: user.as_ref().map_or(0, |u| u.tokens),
        plan: user.and_then(|u| u.plan),
    }))
}

/// POST /api/optimization-prompt - Build the prompt the dialog previews.
///
/// Free of charge; tokens are only spent by `/api/optimize-product`.
#[instrument(skip(state, session, request), fields(shop = %session.shop))]
async fn optimization_prompt(
    session: ShopSession,
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<Value>, AppError> {
    let product_id = require_product_id(&request.product_id)?;
    let client = state.admin_client(&session.shop, Some(&session.token)).await?;

    let product = client
        .get_product(&product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {product_id}")))?;

    let prompt = generate_optimization_prompt(&product.facts(), &request.settings)?;

    Ok(Json(json!({ "prompt": prompt })))
}

/// POST /api/optimize-product - Spend a token and run the prompt.
#[instrument(skip(state, session, request), fields(shop = %session.shop))]
async fn optimize_product(
    session: ShopSession,
    State(state): State<AppState>,
    Json(request): Json<OptimizeRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = OptimizerService::new(state.pool(), state.llm())
        .run(&session.shop, &request.prompt, &request.fields)
        .await?;

    Ok(Json(json!({
        "result": outcome.raw,
        "optimization": outcome.result,
        "tokens": outcome.tokens,
    })))
}

/// GET /api/product-version?productId=... - Versions, oldest first.
#[instrument(skip(state, session), fields(shop = %session.shop))]
async fn list_versions(
    session: ShopSession,
    State(state): State<AppState>,
    Query(query): Query<VersionQuery>,
) -> Result<Json<VersionsResponse>, AppError> {
    let product_id = require_product_id(&query.product_id)?;
    let versions = ProductVersionRepository::new(state.pool())
        .list_for_product(&session.shop, &product_id)
        .await?;

    Ok(Json(VersionsResponse { versions }))
}

/// POST /api/product-version - Append a version.
#[instrument(skip(state, session, request), fields(shop = %session.shop))]
async fn create_version(
    session: ShopSession,
    State(state): State<AppState>,
    Json(request): Json<CreateVersionRequest>,
) -> Result<Json<Value>, AppError> {
    let product_id = require_product_id(&request.product_id)?;
    let new_version = NewProductVersion {
        product_id,
        title: request.title.trim().to_string(),
        description: request.description,
        tags: request.tags.into_tags(),
        score: request.score,
        status: request.status,
    };

    let version = ProductVersionRepository::new(state.pool())
        .create(&session.shop, &new_version)
        .await?;

    Ok(Json(json!({ "success": true, "version": version })))
}

/// POST /api/update-shopify-product - Push approved fields to Shopify.
///
/// Empty fields are left unchanged. A metered plan is charged once per
/// successful update; a failed charge is logged and does not undo it.
#[instrument(skip(state, session, request), fields(shop = %session.shop))]
async fn update_shopify_product(
    session: ShopSession,
    State(state): State<AppState>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<Json<UpdateProductResponse>, AppError> {
    let product_id = require_product_id(&request.product_id)?;
    let update = request.into_update();
    if update.is_empty() {
        return Err(AppError::BadRequest("Nothing to update".to_string()));
    }

    let client = state.admin_client(&session.shop, Some(&session.token)).await?;
    let product = client.update_product(&product_id, update).await?;
    tracing::info!(product_id = %product.id, "Product updated");

    let description = format!("שיפור מוצר: {}", product.title);
    match BillingService::new(&client, state.pool())
        .charge_usage(&description)
        .await
    {
        Ok(Some(record_id)) => tracing::info!(record_id = %record_id, "Usage charged"),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to record usage charge"),
    }

    Ok(Json(UpdateProductResponse {
        success: true,
        product,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_input_accepts_list_or_string() {
        let list: TagsInput = serde_json::from_str(r#"[" blue ", "", "shirt"]"#).unwrap();
        assert_eq!(list.into_tags(), vec!["blue", "shirt"]);

        let joined: TagsInput = serde_json::from_str(r#""blue, shirt ,,""#).unwrap();
        assert_eq!(joined.into_tags(), vec!["blue", "shirt"]);
    }

    #[test]
    fn test_tags_input_splits_commas_inside_list_entries() {
        let list: TagsInput = serde_json::from_str(r#"["blue, navy", "shirt"]"#).unwrap();
        assert_eq!(list.into_tags(), vec!["blue", "navy", "shirt"]);
    }

    #[test]
    fn test_update_request_skips_empty_fields() {
        let request: UpdateProductRequest = serde_json::from_str(
            r#"{"productId": "123", "title": "  ", "description": "<p>Soft</p>", "tags": ""}"#,
        )
        .unwrap();
        let update = request.into_update();
        assert_eq!(update.title, None);
        assert_eq!(update.description_html.as_deref(), Some("<p>Soft</p>"));
        assert_eq!(update.tags, None);
    }

    #[test]
    fn test_update_request_all_empty() {
        let request: UpdateProductRequest =
            serde_json::from_str(r#"{"productId": "123"}"#).unwrap();
        assert!(request.into_update().is_empty());
    }

    #[test]
    fn test_create_version_request_accepts_hebrew_status() {
        let request: CreateVersionRequest = serde_json::from_str(
            r#"{"productId": "gid://shopify/Product/1", "title": "T", "tags": "a,b", "score": 140, "status": "מוצעת"}"#,
        )
        .unwrap();
        assert_eq!(request.status, VersionStatus::Proposed);
        assert_eq!(request.score.value(), 100);
    }

    #[test]
    fn test_require_product_id() {
        assert_eq!(
            require_product_id("42").unwrap(),
            "gid://shopify/Product/42"
        );
        assert!(require_product_id("gid://shopify/Order/42").is_err());
        assert!(require_product_id("").is_err());
    }
}
