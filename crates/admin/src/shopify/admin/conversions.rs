//! Conversions from GraphQL response shapes to domain types.

use crate::shopify::types::{
    AppSubscription, AppSubscriptionLineItem, PricingDetails, Product, ProductConnection,
};

use super::queries::{ProductNode, active_subscriptions, get_products};

pub fn convert_product(node: ProductNode) -> Product {
    Product {
        id: node.id,
        title: node.title,
        description: node.description,
        description_html: node.description_html,
        handle: node.handle,
        product_type: node.product_type,
        tags: node.tags,
        featured_image: node.featured_image,
        price: node.price_range_v2.map(|range| range.min_variant_price),
        online_store_url: node.online_store_url,
    }
}

pub fn convert_product_connection(products: get_products::Products) -> ProductConnection {
    ProductConnection {
        products: products.nodes.into_iter().map(convert_product).collect(),
        page_info: products.page_info,
    }
}

/// Convert a subscription, dropping line items with pricing we don't model.
pub fn convert_subscription(node: active_subscriptions::SubscriptionNode) -> AppSubscription {
    use active_subscriptions::PricingDetailsNode;

    let line_items = node
        .line_items
        .into_iter()
        .filter_map(|item| {
            let pricing = match item.plan.pricing_details {
                PricingDetailsNode::AppRecurringPricing { price, interval } => {
                    PricingDetails::Recurring { price, interval }
                }
                PricingDetailsNode::AppUsagePricing {
                    terms,
                    capped_amount,
                    balance_used,
                } => PricingDetails::Usage {
                    terms,
                    capped_amount,
                    balance_used,
                },
                PricingDetailsNode::Unknown => return None,
            };
            Some(AppSubscriptionLineItem { id: item.id, pricing })
        })
        .collect();

    AppSubscription {
        id: node.id,
        name: node.name,
        status: node.status,
        test: node.test,
        current_period_end: node.current_period_end,
        line_items,
    }
}
