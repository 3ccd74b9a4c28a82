//! Plan selection, confirmation and usage charges.
//!
//! Shopify is the source of truth for which plan is active; the local
//! `shop_user` row mirrors it and carries the token balance.

use product_optimizer_core::SubscriptionPlan;
use sqlx::PgPool;
use tracing::instrument;

use crate::db::{ShopUser, ShopUserRepository};
use crate::error::AppError;
use crate::shopify::{AdminClient, AppSubscription};

/// Outcome of selecting a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanSelection {
    /// The plan was already active; its tokens have been granted.
    AlreadyActive(ShopUser),
    /// The merchant must approve the charge at this URL.
    ApprovalRequired(String),
}

/// Billing operations for one shop.
pub struct BillingService<'a> {
    client: &'a AdminClient,
    pool: &'a PgPool,
}

impl<'a> BillingService<'a> {
    /// Create a billing service for the shop behind `client`.
    #[must_use]
    pub const fn new(client: &'a AdminClient, pool: &'a PgPool) -> Self {
        Self { client, pool }
    }

    /// The active subscription for one of our plans, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the Shopify request fails.
    pub async fn active_subscription(&self) -> Result<Option<AppSubscription>, AppError> {
        let subscriptions = self.client.active_subscriptions().await?;
        Ok(subscriptions
            .into_iter()
            .find(|s| s.is_active() && s.plan().is_some()))
    }

    /// Select `plan`.
    ///
    /// If Shopify already bills the shop for `plan` the local record is
    /// updated straight away; otherwise a subscription is created and the
    /// confirmation URL returned.
    ///
    /// # Errors
    ///
    /// Returns an error if a Shopify request or the database update fails.
    #[instrument(skip(self, return_url), fields(shop = %self.client.shop(), plan = %plan))]
    pub async fn select_plan(
        &self,
        plan: SubscriptionPlan,
        return_url: &str,
        test: bool,
    ) -> Result<PlanSelection, AppError> {
        if let Some(active) = self.active_subscription().await?
            && active.plan() == Some(plan)
        {
            let user = self.activate(plan).await?;
            return Ok(PlanSelection::AlreadyActive(user));
        }

        let created = self.client.create_subscription(plan, return_url, test).await?;
        tracing::info!("Subscription created, awaiting merchant approval");
        Ok(PlanSelection::ApprovalRequired(created.confirmation_url))
    }

    /// Mirror the active Shopify subscription locally.
    ///
    /// Returns the updated record, or `None` if no plan is active yet (for
    /// example when the merchant declined the charge).
    ///
    /// # Errors
    ///
    /// Returns an error if a Shopify request or the database update fails.
    #[instrument(skip(self), fields(shop = %self.client.shop()))]
    pub async fn confirm(&self) -> Result<Option<ShopUser>, AppError> {
        let Some(plan) = self.active_subscription().await?.and_then(|s| s.plan()) else {
            tracing::info!("No active subscription after billing return");
            return Ok(None);
        };
        Ok(Some(self.activate(plan).await?))
    }

    /// Bill one metered use, if the active plan is metered.
    ///
    /// Returns the usage record GID when a charge was created.
    ///
    /// # Errors
    ///
    /// Returns an error if Shopify rejects the charge.
    #[instrument(skip(self, description), fields(shop = %self.client.shop()))]
    pub async fn charge_usage(&self, description: &str) -> Result<Option<String>, AppError> {
        let Some(active) = self.active_subscription().await? else {
            return Ok(None);
        };
        let (Some(plan), Some(line_item_id)) = (active.plan(), active.usage_line_item_id()) else {
            return Ok(None);
        };
        let Some(charge) = plan.usage_charge() else {
            return Ok(None);
        };

        let record_id = self
            .client
            .create_usage_record(line_item_id, charge.price, description, None)
            .await?;
        Ok(Some(record_id))
    }

    async fn activate(&self, plan: SubscriptionPlan) -> Result<ShopUser, AppError> {
        let tokens = i32::try_from(plan.tokens_granted()).unwrap_or(i32::MAX);
        let user = ShopUserRepository::new(self.pool)
            .activate_plan(self.client.shop(), plan, tokens)
            .await?;
        tracing::info!(plan = %plan, tokens = user.tokens, "Plan activated");
        Ok(user)
    }
}
