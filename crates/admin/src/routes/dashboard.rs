//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use product_optimizer_core::SubscriptionPlan;
use tracing::instrument;

use crate::db::ShopUserRepository;
use crate::filters;
use crate::middleware::ShopSession;
use crate::state::AppState;

use super::products::{ProductRow, ProductStats, SHOPIFY_ERROR_MESSAGE, product_rows};
use super::{EmbeddedQuery, Shell};

/// Products loaded for the dashboard.
const DASHBOARD_PRODUCTS: i64 = 8;

/// Products shown as recent cards.
const RECENT_PRODUCTS: usize = 4;

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub shell: Shell,
    pub stats: ProductStats,
    pub recent: Vec<ProductRow>,
    /// Active plan, if one was chosen.
    pub plan: Option<SubscriptionPlan>,
    /// The plan promoted in the upsell card.
    pub agent_plan: SubscriptionPlan,
    pub error_message: Option<&'static str>,
}

impl DashboardTemplate {
    /// Whether the promoted plan is the active one.
    #[must_use]
    pub fn agent_active(&self) -> bool {
        self.plan == Some(self.agent_plan)
    }
}

/// GET /app/dashboard - Overview of the first products and their scores.
#[instrument(skip(state, session, query), fields(shop = %session.shop))]
pub async fn index(
    session: ShopSession,
    State(state): State<AppState>,
    Query(query): Query<EmbeddedQuery>,
) -> DashboardTemplate {
    let shell = Shell::load(&state, &session, query.host, "/app/dashboard").await;

    let fetched = match state.admin_client(&session.shop, Some(&session.token)).await {
        Ok(client) => client
            .get_products(DASHBOARD_PRODUCTS, None, None)
            .await
            .map_err(crate::error::AppError::from),
        Err(e) => Err(e),
    };

    let (rows, error_message) = match fetched {
        Ok(connection) => (
            product_rows(&state, &session.shop, &connection.products).await,
            None,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch dashboard products");
            (vec![], Some(SHOPIFY_ERROR_MESSAGE))
        }
    };

    let plan = match ShopUserRepository::new(state.pool())
        .get_by_shop(&session.shop)
        .await
    {
        Ok(user) => user.and_then(|u| u.plan),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load shop plan");
            None
        }
    };

    DashboardTemplate {
        shell,
        stats: ProductStats::from_rows(&rows),
        recent: rows.into_iter().take(RECENT_PRODUCTS).collect(),
        plan,
        agent_plan: SubscriptionPlan::AiAgent,
        error_message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dashboard(plan: Option<SubscriptionPlan>) -> DashboardTemplate {
        DashboardTemplate {
            shell: Shell {
                api_key: "key".to_string(),
                shop: "demo.myshopify.com".to_string(),
                host: None,
                current_path: "/app/dashboard",
                tokens: Some(5),
            },
            stats: ProductStats::default(),
            recent: Vec::new(),
            plan,
            agent_plan: SubscriptionPlan::AiAgent,
            error_message: None,
        }
    }

    #[test]
    fn test_upsell_offers_agent_plan_when_inactive() {
        let template = dashboard(Some(SubscriptionPlan::Monthly));
        assert!(!template.agent_active());
        let html = template.render().unwrap();
        assert!(!html.contains("באופן אוטומטי"));
    }

    #[test]
    fn test_upsell_marks_agent_plan_active() {
        let template = dashboard(Some(SubscriptionPlan::AiAgent));
        assert!(template.agent_active());
        let html = template.render().unwrap();
        assert!(html.contains("באופן אוטומטי"));
    }
}
