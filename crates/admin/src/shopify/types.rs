//! Domain types for Shopify Admin API data.
//!
//! These are the shapes handlers and templates work with. The raw GraphQL
//! response types live in `admin::queries` and are converted into these.

use product_optimizer_core::{CurrencyCode, SubscriptionPlan};
use serde::{Deserialize, Serialize};

use crate::optimization::ProductFacts;

const PRODUCT_GID_PREFIX: &str = "gid://shopify/Product/";

// =============================================================================
// Common Types
// =============================================================================

/// Monetary amount as returned by Shopify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    /// Decimal amount as string (preserves precision).
    pub amount: String,
    /// ISO 4217 currency code.
    pub currency_code: String,
}

impl Money {
    /// Format for display, e.g. `₪79.00` or `12.50 GBP`.
    #[must_use]
    pub fn display(&self) -> String {
        match CurrencyCode::from_code(&self.currency_code) {
            Some(code) => format!("{}{}", code.symbol(), self.amount),
            None => format!("{} {}", self.amount, self.currency_code),
        }
    }
}

/// Product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub url: String,
    pub alt_text: Option<String>,
}

/// Pagination information for connections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether there are more items after this page.
    pub has_next_page: bool,
    /// Whether there are items before this page.
    pub has_previous_page: bool,
    /// Cursor for the first item.
    pub start_cursor: Option<String>,
    /// Cursor for the last item.
    pub end_cursor: Option<String>,
}

/// A validation error returned by a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserError {
    /// Path to the offending input field.
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) if !field.is_empty() => write!(f, "{}: {}", field.join("."), self.message),
            _ => f.write_str(&self.message),
        }
    }
}

// =============================================================================
// Product Types
// =============================================================================

/// A product as shown in the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product GID (e.g., `gid://shopify/Product/123`).
    pub id: String,
    pub title: String,
    /// Plain-text description.
    pub description: String,
    /// HTML description; only fetched for single products.
    pub description_html: Option<String>,
    pub handle: String,
    /// Product type, shown as the category.
    pub product_type: String,
    pub tags: Vec<String>,
    pub featured_image: Option<Image>,
    /// Lowest variant price.
    pub price: Option<Money>,
    pub online_store_url: Option<String>,
}

impl Product {
    /// Numeric part of the product GID, used in app URLs.
    #[must_use]
    pub fn numeric_id(&self) -> &str {
        numeric_product_id(&self.id)
    }

    /// Facts for the optimization prompt.
    #[must_use]
    pub fn facts(&self) -> ProductFacts {
        ProductFacts {
            title: self.title.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            category: Some(self.product_type.clone()).filter(|c| !c.is_empty()),
            price: self.price.as_ref().map(Money::display),
        }
    }
}

/// Paginated list of products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductConnection {
    pub products: Vec<Product>,
    pub page_info: PageInfo,
}

/// Normalize a product identifier to its GID form.
///
/// Accepts a full GID or the bare numeric id used in app URLs.
#[must_use]
pub fn product_gid(id: &str) -> String {
    let id = id.trim();
    if id.starts_with(PRODUCT_GID_PREFIX) {
        id.to_string()
    } else {
        format!("{PRODUCT_GID_PREFIX}{id}")
    }
}

/// Numeric tail of a product GID; returns the input when it is not a GID.
#[must_use]
pub fn numeric_product_id(id: &str) -> &str {
    id.strip_prefix(PRODUCT_GID_PREFIX).unwrap_or(id)
}

/// Whether a product identifier looks valid (GID or numeric).
#[must_use]
pub fn is_valid_product_id(id: &str) -> bool {
    let tail = numeric_product_id(id.trim());
    !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit())
}

// =============================================================================
// Billing Types
// =============================================================================

/// Pricing attached to a subscription line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingDetails {
    /// Fixed recurring charge.
    Recurring { price: Money, interval: String },
    /// Metered usage charge.
    Usage {
        terms: String,
        capped_amount: Money,
        balance_used: Money,
    },
}

/// A line item of an app subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppSubscriptionLineItem {
    /// Line item GID; usage records are created against it.
    pub id: String,
    pub pricing: PricingDetails,
}

/// An app subscription on the current installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppSubscription {
    pub id: String,
    /// Plan name as submitted when the subscription was created.
    pub name: String,
    /// Shopify status, e.g. `ACTIVE` or `PENDING`.
    pub status: String,
    pub test: bool,
    pub current_period_end: Option<String>,
    pub line_items: Vec<AppSubscriptionLineItem>,
}

impl AppSubscription {
    /// The plan this subscription was created for, if it is one of ours.
    #[must_use]
    pub fn plan(&self) -> Option<SubscriptionPlan> {
        SubscriptionPlan::from_name(&self.name)
    }

    /// Whether the subscription is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("ACTIVE")
    }

    /// GID of the metered line item, if the subscription has one.
    #[must_use]
    pub fn usage_line_item_id(&self) -> Option<&str> {
        self.line_items
            .iter()
            .find(|item| matches!(item.pricing, PricingDetails::Usage { .. }))
            .map(|item| item.id.as_str())
    }
}

/// Result of requesting a new subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSubscription {
    pub subscription_id: Option<String>,
    /// Where the merchant approves the charge.
    pub confirmation_url: String,
}
