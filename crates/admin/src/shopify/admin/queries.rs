//! GraphQL operations for the Shopify Admin API.
//!
//! Each operation implements `graphql_client::GraphQLQuery` with its query
//! text, variables and response shape, so [`super::AdminClient::execute`]
//! can run any of them with the same error handling.

use graphql_client::{GraphQLQuery, QueryBody};
use serde::{Deserialize, Serialize};

use crate::shopify::types::{Image, Money, PageInfo, UserError};

/// Implement `GraphQLQuery` for an operation whose module holds `QUERY`,
/// `Variables` and `ResponseData`.
macro_rules! graphql_operation {
    ($name:ident, $module:ident) => {
        pub struct $name;

        impl GraphQLQuery for $name {
            type Variables = $module::Variables;
            type ResponseData = $module::ResponseData;

            fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
                QueryBody {
                    variables,
                    query: $module::QUERY,
                    operation_name: stringify!($name),
                }
            }
        }
    };
}

// =============================================================================
// Shared response shapes
// =============================================================================

/// Product fields shared by list and detail queries.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductNode {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description_html: Option<String>,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub featured_image: Option<Image>,
    pub price_range_v2: Option<PriceRange>,
    #[serde(default)]
    pub online_store_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min_variant_price: Money,
}

/// Money input for billing mutations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyInput {
    pub amount: rust_decimal::Decimal,
    pub currency_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdNode {
    pub id: String,
}

// =============================================================================
// Product queries
// =============================================================================

graphql_operation!(GetProducts, get_products);

pub mod get_products {
    use super::{Deserialize, PageInfo, ProductNode, Serialize};

    pub const QUERY: &str = r"
query GetProducts($first: Int!, $after: String, $query: String) {
  products(first: $first, after: $after, query: $query, sortKey: UPDATED_AT, reverse: true) {
    nodes {
      id
      title
      description
      handle
      productType
      tags
      featuredImage { url altText }
      priceRangeV2 { minVariantPrice { amount currencyCode } }
    }
    pageInfo { hasNextPage hasPreviousPage startCursor endCursor }
  }
}
";

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub first: i64,
        pub after: Option<String>,
        pub query: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        pub products: Products,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Products {
        pub nodes: Vec<ProductNode>,
        pub page_info: PageInfo,
    }
}

graphql_operation!(GetProduct, get_product);

pub mod get_product {
    use super::{Deserialize, ProductNode, Serialize};

    pub const QUERY: &str = r"
query GetProduct($id: ID!) {
  product(id: $id) {
    id
    title
    description
    descriptionHtml
    handle
    productType
    tags
    onlineStoreUrl
    featuredImage { url altText }
    priceRangeV2 { minVariantPrice { amount currencyCode } }
  }
}
";

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub id: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        pub product: Option<ProductNode>,
    }
}

graphql_operation!(ProductUpdate, product_update);

pub mod product_update {
    use super::{Deserialize, Serialize, UserError};

    pub const QUERY: &str = r"
mutation ProductUpdate($product: ProductUpdateInput!) {
  productUpdate(product: $product) {
    product { id title descriptionHtml tags }
    userErrors { field message }
  }
}
";

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub product: ProductInput,
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProductInput {
        pub id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub description_html: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub tags: Option<Vec<String>>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub product_update: Option<Payload>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub product: Option<UpdatedProduct>,
        #[serde(default)]
        pub user_errors: Vec<UserError>,
    }

    /// Fields echoed back by `productUpdate`.
    #[derive(Debug, Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UpdatedProduct {
        pub id: String,
        pub title: String,
        #[serde(default)]
        pub description_html: Option<String>,
        #[serde(default)]
        pub tags: Vec<String>,
    }
}

// =============================================================================
// Billing
// =============================================================================

graphql_operation!(ActiveSubscriptions, active_subscriptions);

pub mod active_subscriptions {
    use super::{Deserialize, Money, Serialize};

    pub const QUERY: &str = r"
query ActiveSubscriptions {
  currentAppInstallation {
    activeSubscriptions {
      id
      name
      status
      test
      currentPeriodEnd
      lineItems {
        id
        plan {
          pricingDetails {
            __typename
            ... on AppRecurringPricing { price { amount currencyCode } interval }
            ... on AppUsagePricing {
              terms
              cappedAmount { amount currencyCode }
              balanceUsed { amount currencyCode }
            }
          }
        }
      }
    }
  }
}
";

    #[derive(Debug, Clone, Default, Serialize)]
    pub struct Variables;

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub current_app_installation: AppInstallation,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AppInstallation {
        #[serde(default)]
        pub active_subscriptions: Vec<SubscriptionNode>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SubscriptionNode {
        pub id: String,
        pub name: String,
        pub status: String,
        #[serde(default)]
        pub test: bool,
        pub current_period_end: Option<String>,
        #[serde(default)]
        pub line_items: Vec<LineItemNode>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct LineItemNode {
        pub id: String,
        pub plan: LineItemPlan,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct LineItemPlan {
        pub pricing_details: PricingDetailsNode,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(tag = "__typename", rename_all_fields = "camelCase")]
    pub enum PricingDetailsNode {
        AppRecurringPricing {
            price: Money,
            interval: String,
        },
        AppUsagePricing {
            terms: String,
            capped_amount: Money,
            balance_used: Money,
        },
        #[serde(other)]
        Unknown,
    }
}

graphql_operation!(AppSubscriptionCreate, app_subscription_create);

pub mod app_subscription_create {
    use super::{Deserialize, IdNode, MoneyInput, Serialize, UserError};

    pub const QUERY: &str = r"
mutation AppSubscriptionCreate(
  $name: String!
  $returnUrl: URL!
  $test: Boolean
  $trialDays: Int
  $lineItems: [AppSubscriptionLineItemInput!]!
) {
  appSubscriptionCreate(
    name: $name
    returnUrl: $returnUrl
    test: $test
    trialDays: $trialDays
    lineItems: $lineItems
  ) {
    appSubscription { id }
    confirmationUrl
    userErrors { field message }
  }
}
";

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub name: String,
        pub return_url: String,
        pub test: bool,
        pub trial_days: i64,
        pub line_items: Vec<LineItemInput>,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct LineItemInput {
        pub plan: PlanInput,
    }

    #[derive(Debug, Clone, Default, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PlanInput {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub app_recurring_pricing_details: Option<RecurringPricingInput>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub app_usage_pricing_details: Option<UsagePricingInput>,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct RecurringPricingInput {
        pub price: MoneyInput,
        pub interval: &'static str,
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UsagePricingInput {
        pub terms: String,
        pub capped_amount: MoneyInput,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub app_subscription_create: Option<Payload>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub app_subscription: Option<IdNode>,
        pub confirmation_url: Option<String>,
        #[serde(default)]
        pub user_errors: Vec<UserError>,
    }
}

graphql_operation!(AppUsageRecordCreate, app_usage_record_create);

pub mod app_usage_record_create {
    use super::{Deserialize, IdNode, MoneyInput, Serialize, UserError};

    pub const QUERY: &str = r"
mutation AppUsageRecordCreate(
  $subscriptionLineItemId: ID!
  $price: MoneyInput!
  $description: String!
  $idempotencyKey: String
) {
  appUsageRecordCreate(
    subscriptionLineItemId: $subscriptionLineItemId
    price: $price
    description: $description
    idempotencyKey: $idempotencyKey
  ) {
    appUsageRecord { id }
    userErrors { field message }
  }
}
";

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub subscription_line_item_id: String,
        pub price: MoneyInput,
        pub description: String,
        pub idempotency_key: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub app_usage_record_create: Option<Payload>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub app_usage_record: Option<IdNode>,
        #[serde(default)]
        pub user_errors: Vec<UserError>,
    }
}
