//! Billing routes: plan selection and the billing return URL.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, header::CONTENT_TYPE},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use product_optimizer_core::SubscriptionPlan;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::db::ShopUserRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::ShopSession;
use crate::services::{BillingService, PlanSelection};
use crate::state::AppState;

use super::{EmbeddedQuery, Shell};

/// Build the billing router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/app/billing", get(index).post(select))
        .route("/app/billing/confirm", get(confirm))
}

// =============================================================================
// Templates
// =============================================================================

/// A plan card.
#[derive(Debug, Clone)]
pub struct PlanCard {
    pub plan: SubscriptionPlan,
    pub headline_price: String,
    pub summary: String,
    pub is_current: bool,
    pub is_featured: bool,
}

impl PlanCard {
    fn new(plan: SubscriptionPlan, current: Option<SubscriptionPlan>) -> Self {
        let headline_price = plan
            .recurring_price()
            .or_else(|| plan.usage_charge().map(|u| u.price))
            .map(|p| p.display())
            .unwrap_or_default();

        Self {
            plan,
            headline_price,
            summary: plan.price_summary(),
            is_current: current == Some(plan),
            is_featured: plan == SubscriptionPlan::Monthly,
        }
    }
}

/// Billing page template.
#[derive(Template, WebTemplate)]
#[template(path = "billing/index.html")]
pub struct BillingTemplate {
    pub shell: Shell,
    pub plans: Vec<PlanCard>,
    pub success_message: Option<&'static str>,
    pub error_message: Option<&'static str>,
}

/// Breaks out of the admin iframe to approve a charge.
#[derive(Template, WebTemplate)]
#[template(path = "billing/approve.html")]
pub struct ApproveChargeTemplate {
    pub shell: Shell,
    pub confirmation_url: String,
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct BillingQuery {
    pub host: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
}

/// GET /app/billing - Plan selection page.
#[instrument(skip(state, session, query), fields(shop = %session.shop))]
pub async fn index(
    session: ShopSession,
    State(state): State<AppState>,
    Query(query): Query<BillingQuery>,
) -> BillingTemplate {
    let shell = Shell::load(&state, &session, query.host, "/app/billing").await;

    let current = match ShopUserRepository::new(state.pool())
        .get_by_shop(&session.shop)
        .await
    {
        Ok(user) => user.and_then(|u| u.plan),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load shop plan");
            None
        }
    };

    let success_message = match query.status.as_deref() {
        Some("activated") => Some("התוכנית הופעלה והטוקנים נוספו לחשבון."),
        _ => None,
    };
    let error_message = match (query.status.as_deref(), query.error.as_deref()) {
        (Some("declined"), _) => Some("החיוב לא אושר. לא בוצע שינוי בתוכנית."),
        (_, Some("missing_plan")) => Some("יש לבחור תוכנית."),
        (_, Some("invalid_plan")) => Some("התוכנית שנבחרה אינה קיימת."),
        (_, Some(_)) => Some("בחירת התוכנית נכשלה. נסה שוב."),
        _ => None,
    };

    BillingTemplate {
        shell,
        plans: SubscriptionPlan::ALL
            .into_iter()
            .map(|plan| PlanCard::new(plan, current))
            .collect(),
        success_message,
        error_message,
    }
}

#[derive(Debug, Deserialize)]
struct PlanRequest {
    plan: Option<String>,
}

/// POST /app/billing - Select a plan.
///
/// Accepts `{"plan": ...}` as JSON (from `fetch`, answered with JSON) or a
/// form field (answered with a page or redirect). The plan may be given by
/// slug or by its Shopify subscription name.
#[instrument(skip(state, session, headers, body, query), fields(shop = %session.shop))]
pub async fn select(
    session: ShopSession,
    State(state): State<AppState>,
    Query(query): Query<EmbeddedQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    let raw_plan = if is_json {
        serde_json::from_slice::<PlanRequest>(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))?
            .plan
    } else {
        url::form_urlencoded::parse(&body)
            .find(|(k, _)| k == "plan")
            .map(|(_, v)| v.into_owned())
    };

    let shell = Shell::load(&state, &session, query.host, "/app/billing").await;

    let Some(raw_plan) = raw_plan.filter(|p| !p.trim().is_empty()) else {
        return if is_json {
            Err(AppError::BadRequest("Missing plan".to_string()))
        } else {
            Ok(Redirect::to(&shell.link("/app/billing?error=missing_plan")).into_response())
        };
    };

    let plan = match raw_plan.parse::<SubscriptionPlan>() {
        Ok(plan) => plan,
        Err(e) if is_json => return Err(AppError::BadRequest(e.to_string())),
        Err(_) => {
            return Ok(Redirect::to(&shell.link("/app/billing?error=invalid_plan")).into_response());
        }
    };

    let client = state.admin_client(&session.shop, Some(&session.token)).await?;
    let return_url = embedded_url(&session.shop, state.shopify().api_key(), "/app/billing/confirm");

    let selection = BillingService::new(&client, state.pool())
        .select_plan(plan, &return_url, state.config().billing_test_mode)
        .await?;

    let response = match (selection, is_json) {
        (PlanSelection::AlreadyActive(user), true) => Json(json!({
            "activated": true,
            "plan": plan,
            "tokens": user.tokens,
        }))
        .into_response(),
        (PlanSelection::AlreadyActive(_), false) => {
            Redirect::to(&shell.link("/app/billing?status=activated")).into_response()
        }
        (PlanSelection::ApprovalRequired(url), true) => {
            Json(json!({ "confirmationUrl": url })).into_response()
        }
        (PlanSelection::ApprovalRequired(confirmation_url), false) => ApproveChargeTemplate {
            shell,
            confirmation_url,
        }
        .into_response(),
    };

    Ok(response)
}

/// GET /app/billing/confirm - Shopify returns here after the merchant
/// approves or declines the charge.
#[instrument(skip(state, session, query), fields(shop = %session.shop))]
pub async fn confirm(
    session: ShopSession,
    State(state): State<AppState>,
    Query(query): Query<EmbeddedQuery>,
) -> Result<Redirect, AppError> {
    let client = state.admin_client(&session.shop, Some(&session.token)).await?;
    let confirmed = BillingService::new(&client, state.pool()).confirm().await?;

    let shell = Shell::load(&state, &session, query.host, "/app/billing").await;
    let target = if confirmed.is_some() {
        "/app/billing?status=activated"
    } else {
        "/app/billing?status=declined"
    };
    Ok(Redirect::to(&shell.link(target)))
}

/// URL of `path` inside the Shopify admin for `shop`.
fn embedded_url(shop: &str, api_key: &str, path: &str) -> String {
    format!("https://{shop}/admin/apps/{api_key}{path}")
}
