//! Subscription plans sold through Shopify billing.
//!
//! Each plan has a fixed recurring price, a metered usage charge, or both.
//! Choosing a plan grants a token balance that paid actions draw down.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::price::{CurrencyCode, Price};

/// Errors parsing a plan identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The identifier matches no plan slug or name.
    #[error("unknown plan: {0}")]
    Unknown(String),
}

/// A metered charge billed per use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageCharge {
    /// Price of a single use.
    pub price: Price,
    /// Maximum usage billed per 30-day cycle.
    pub capped_amount: Price,
    /// Terms shown to the merchant on the approval screen.
    pub terms: &'static str,
}

impl UsageCharge {
    /// Number of uses the capped amount covers.
    #[must_use]
    pub fn uses_per_cycle(&self) -> u32 {
        if self.price.amount.is_zero() {
            return 0;
        }
        (self.capped_amount.amount / self.price.amount)
            .floor()
            .to_u32()
            .unwrap_or(u32::MAX)
    }
}

/// Subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "optimizer.subscription_plan", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    /// Pay per improved product, no monthly fee.
    Usage,
    /// Monthly credit bundle.
    Monthly,
    /// Automatic AI agent: monthly fee plus a per-update charge.
    AiAgent,
}

/// Monthly credits included in [`SubscriptionPlan::Monthly`].
const MONTHLY_CREDITS: u32 = 50;

impl SubscriptionPlan {
    /// All plans in display order.
    pub const ALL: [Self; 3] = [Self::Usage, Self::Monthly, Self::AiAgent];

    /// Stable slug used in forms and the database.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Usage => "usage",
            Self::Monthly => "monthly",
            Self::AiAgent => "ai_agent",
        }
    }

    /// Subscription name registered with Shopify billing.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Usage => "שלם לפי שימוש",
            Self::Monthly => "חבילת קרדיטים חודשית",
            Self::AiAgent => "סוכן AI אוטומטי",
        }
    }

    /// Fixed price billed every 30 days, if any.
    #[must_use]
    pub const fn recurring_price(self) -> Option<Price> {
        match self {
            Self::Usage => None,
            Self::Monthly => Some(Price::new(Decimal::from_parts(79, 0, 0, false, 0), CurrencyCode::ILS)),
            Self::AiAgent => Some(Price::new(Decimal::from_parts(297, 0, 0, false, 0), CurrencyCode::ILS)),
        }
    }

    /// Metered per-use charge, if any.
    #[must_use]
    pub const fn usage_charge(self) -> Option<UsageCharge> {
        match self {
            Self::Usage => Some(UsageCharge {
                price: Price::new(Decimal::from_parts(2, 0, 0, false, 0), CurrencyCode::ILS),
                capped_amount: Price::new(Decimal::from_parts(2000, 0, 0, false, 0), CurrencyCode::ILS),
                terms: "לכל מוצר משופר",
            }),
            Self::Monthly => None,
            Self::AiAgent => Some(UsageCharge {
                price: Price::new(Decimal::from_parts(5, 0, 0, false, 1), CurrencyCode::ILS),
                capped_amount: Price::new(Decimal::from_parts(500, 0, 0, false, 0), CurrencyCode::ILS),
                terms: "לכל עדכון",
            }),
        }
    }

    /// Tokens granted when the plan becomes active.
    ///
    /// Metered plans get one token per use the capped amount covers.
    #[must_use]
    pub fn tokens_granted(self) -> u32 {
        match self {
            Self::Monthly => MONTHLY_CREDITS,
            Self::Usage | Self::AiAgent => self
                .usage_charge()
                .map_or(0, |charge| charge.uses_per_cycle()),
        }
    }

    /// Trial days offered by the plan.
    #[must_use]
    pub const fn trial_days(self) -> u32 {
        0
    }

    /// One-line price summary for the plan card.
    #[must_use]
    pub fn price_summary(self) -> String {
        match (self.recurring_price(), self.usage_charge()) {
            (Some(recurring), Some(usage)) => {
                format!("{} חודשי + {} {}", recurring.display(), usage.price.display(), usage.terms)
            }
            (Some(recurring), None) => format!("{} לחודש, {} קרדיטים", recurring.display(), MONTHLY_CREDITS),
            (None, Some(usage)) => format!("{} {}", usage.price.display(), usage.terms),
            (None, None) => String::new(),
        }
    }

    /// Feature bullets shown on the billing page.
    #[must_use]
    pub const fn features(self) -> &'static [&'static str] {
        match self {
            Self::Usage => &[
                "בלי מנוי חודשי",
                "שלם רק על מוצרים שמשתפרים",
                "ללא התחייבות",
                "מושלם לחנויות קטנות",
            ],
            Self::Monthly => &[
                "₪1.58 לכל מוצר (חיסכון 21%)",
                "קרדיטים לא מנוצלים עוברים לחודש הבא",
                "דוחות מתקדמים",
                "תמיכה מועדפת",
            ],
            Self::AiAgent => &[
                "עדכון אוטומטי של כל המוצרים",
                "ניטור שינויים באלגוריתמי AI",
                "עדכון אוטומטי כשיש שיפורים",
                "דוחות שבועיים מפורטים",
                "תמיכת VIP 24/7",
            ],
        }
    }

    /// Look up a plan by its Shopify subscription name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|plan| plan.name() == name)
    }
}

impl std::fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl std::str::FromStr for SubscriptionPlan {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|plan| plan.slug() == s || plan.name() == s)
            .ok_or_else(|| PlanError::Unknown(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_granted_per_plan() {
        assert_eq!(SubscriptionPlan::Monthly.tokens_granted(), 50);
        assert_eq!(SubscriptionPlan::Usage.tokens_granted(), 1000);
        assert_eq!(SubscriptionPlan::AiAgent.tokens_granted(), 1000);
    }

    #[test]
    fn test_plan_pricing() {
        assert!(SubscriptionPlan::Usage.recurring_price().is_none());
        assert!(SubscriptionPlan::Monthly.usage_charge().is_none());

        let ai = SubscriptionPlan::AiAgent;
        assert_eq!(ai.recurring_price().map(|p| p.display()), Some("₪297".to_string()));
        assert_eq!(
            ai.usage_charge().map(|c| c.price.display()),
            Some("₪0.5".to_string())
        );
    }

    #[test]
    fn test_plan_from_str_accepts_slug_and_name() {
        assert_eq!("monthly".parse::<SubscriptionPlan>(), Ok(SubscriptionPlan::Monthly));
        assert_eq!(
            SubscriptionPlan::AiAgent.name().parse::<SubscriptionPlan>(),
            Ok(SubscriptionPlan::AiAgent)
        );
        assert_eq!(
            "enterprise".parse::<SubscriptionPlan>(),
            Err(PlanError::Unknown("enterprise".to_string()))
        );
    }

    #[test]
    fn test_plan_names_are_unique() {
        for plan in SubscriptionPlan::ALL {
            assert_eq!(SubscriptionPlan::from_name(plan.name()), Some(plan));
        }
    }

    #[test]
    fn test_price_summary() {
        assert_eq!(SubscriptionPlan::Usage.price_summary(), "₪2 לכל מוצר משופר");
        assert_eq!(SubscriptionPlan::Monthly.price_summary(), "₪79 לחודש, 50 קרדיטים");
    }
}
