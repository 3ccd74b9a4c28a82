//! App subscriptions and usage charges.

use product_optimizer_core::{Price, SubscriptionPlan};
use tracing::instrument;

use super::{
    AdminClient, AdminShopifyError,
    conversions::convert_subscription,
    queries::{
        ActiveSubscriptions, AppSubscriptionCreate, AppUsageRecordCreate, MoneyInput,
        active_subscriptions, app_subscription_create, app_usage_record_create,
    },
};
use crate::shopify::{
    GraphQLError,
    types::{AppSubscription, CreatedSubscription},
};

const RECURRING_INTERVAL: &str = "EVERY_30_DAYS";

fn money_input(price: Price) -> MoneyInput {
    MoneyInput {
        amount: price.amount,
        currency_code: price.currency_code.code().to_string(),
    }
}

/// Line items Shopify bills for a plan: a recurring charge, a usage
/// charge, or both.
pub(super) fn plan_line_items(plan: SubscriptionPlan) -> Vec<app_subscription_create::LineItemInput> {
    use app_subscription_create::{LineItemInput, PlanInput, RecurringPricingInput, UsagePricingInput};

    let recurring = plan.recurring_price().map(|price| LineItemInput {
        plan: PlanInput {
            app_recurring_pricing_details: Some(RecurringPricingInput {
                price: money_input(price),
                interval: RECURRING_INTERVAL,
            }),
            app_usage_pricing_details: None,
        },
    });

    let usage = plan.usage_charge().map(|charge| LineItemInput {
        plan: PlanInput {
            app_recurring_pricing_details: None,
            app_usage_pricing_details: Some(UsagePricingInput {
                terms: charge.terms.to_string(),
                capped_amount: money_input(charge.capped_amount),
            }),
        },
    });

    recurring.into_iter().chain(usage).collect()
}

impl AdminClient {
    /// Subscriptions currently active on this installation.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(shop = %self.shop()))]
    pub async fn active_subscriptions(&self) -> Result<Vec<AppSubscription>, AdminShopifyError> {
        let response = self
            .execute::<ActiveSubscriptions>(active_subscriptions::Variables)
            .await?;

        Ok(response
            .current_app_installation
            .active_subscriptions
            .into_iter()
            .map(convert_subscription)
            .collect())
    }

    /// Request a subscription to `plan`.
    ///
    /// The merchant must approve it at the returned confirmation URL.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::UserErrors` if Shopify rejects the request.
    #[instrument(skip(self), fields(shop = %self.shop(), plan = %plan))]
    pub async fn create_subscription(
        &self,
        plan: SubscriptionPlan,
        return_url: &str,
        test: bool,
    ) -> Result<CreatedSubscription, AdminShopifyError> {
        let variables = app_subscription_create::Variables {
            name: plan.name().to_string(),
            return_url: return_url.to_string(),
            test,
            trial_days: i64::from(plan.trial_days()),
            line_items: plan_line_items(plan),
        };

        let response = self.execute::<AppSubscriptionCreate>(variables).await?;

        let Some(payload) = response.app_subscription_create else {
            return Err(AdminShopifyError::GraphQL(vec![GraphQLError::message(
                "No payload returned from appSubscriptionCreate",
            )]));
        };

        if !payload.user_errors.is_empty() {
            return Err(AdminShopifyError::UserErrors(payload.user_errors));
        }

        let confirmation_url = payload.confirmation_url.ok_or_else(|| {
            AdminShopifyError::GraphQL(vec![GraphQLError::message("No confirmation URL returned")])
        })?;

        Ok(CreatedSubscription {
            subscription_id: payload.app_subscription.map(|s| s.id),
            confirmation_url,
        })
    }

    /// Bill a usage charge against a subscription's metered line item.
    ///
    /// Returns the usage record GID.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::UserErrors` if Shopify rejects the charge
    /// (for example when the capped amount is reached).
    #[instrument(skip(self), fields(shop = %self.shop()))]
    pub async fn create_usage_record(
        &self,
        line_item_id: &str,
        price: Price,
        description: &str,
        idempotency_key: Option<String>,
    ) -> Result<String, AdminShopifyError> {
        let variables = app_usage_record_create::Variables {
            subscription_line_item_id: line_item_id.to_string(),
            price: money_input(price),
            description: description.to_string(),
            idempotency_key,
        };

        let response = self.execute::<AppUsageRecordCreate>(variables).await?;

        let Some(payload) = response.app_usage_record_create else {
            return Err(AdminShopifyError::GraphQL(vec![GraphQLError::message(
                "No payload returned from appUsageRecordCreate",
            )]));
        };

        if !payload.user_errors.is_empty() {
            return Err(AdminShopifyError::UserErrors(payload.user_errors));
        }

        payload.app_usage_record.map(|r| r.id).ok_or_else(|| {
            AdminShopifyError::GraphQL(vec![GraphQLError::message("No usage record returned")])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_items_per_plan() {
        let usage = plan_line_items(SubscriptionPlan::Usage);
        assert_eq!(usage.len(), 1);
        assert!(usage[0].plan.app_usage_pricing_details.is_some());

        let monthly = plan_line_items(SubscriptionPlan::Monthly);
        assert_eq!(monthly.len(), 1);
        assert!(monthly[0].plan.app_recurring_pricing_details.is_some());

        let ai = plan_line_items(SubscriptionPlan::AiAgent);
        assert_eq!(ai.len(), 2);
    }

    #[test]
    fn test_monthly_line_item_price() {
        let items = plan_line_items(SubscriptionPlan::Monthly);
        let json = serde_json::to_value(&items).expect("serialize");
        let price = &json[0]["plan"]["appRecurringPricingDetails"]["price"];
        assert_eq!(price["currencyCode"], "ILS");
        assert_eq!(price["amount"], "79");
    }
}
