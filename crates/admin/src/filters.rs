//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Numeric tail of a product GID, for app URLs.
///
/// Usage in templates: `{{ product.id|gid_number }}`
#[askama::filter_fn]
pub fn gid_number(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let id = value.to_string();
    Ok(crate::shopify::numeric_product_id(&id).to_string())
}

