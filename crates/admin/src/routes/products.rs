//! Product pages: the product table and the product detail page.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use product_optimizer_core::{Score, ScoreBand, VersionStatus};
use serde::Deserialize;
use tracing::instrument;

use crate::db::{ProductVersion, ProductVersionRepository};
use crate::filters;
use crate::middleware::ShopSession;
use crate::optimization::{DetailLevel, FocusArea, Tone};
use crate::shopify::{Product, is_valid_product_id, product_gid};
use crate::state::AppState;

use super::Shell;

/// Products per page in the product table.
pub const PAGE_SIZE: i64 = 20;

/// Tags shown in a table row before collapsing into `+N`.
const VISIBLE_TAGS: usize = 3;

/// Message shown when Shopify could not be reached.
pub const SHOPIFY_ERROR_MESSAGE: &str = "לא ניתן היה לטעון מוצרים מ-Shopify. נסה לרענן את הדף.";

// =============================================================================
// Views
// =============================================================================

/// A product row with its latest optimization state.
#[derive(Debug, Clone)]
pub struct ProductRow {
    /// Product GID.
    pub id: String,
    pub title: String,
    pub category: String,
    pub price: String,
    pub image_url: Option<String>,
    pub visible_tags: Vec<String>,
    pub hidden_tag_count: usize,
    /// Score of the latest version; `None` if never optimized.
    pub score: Option<Score>,
}

impl ProductRow {
    /// Build a row from a product and its latest version, if any.
    #[must_use]
    pub fn new(product: &Product, latest: Option<&ProductVersion>) -> Self {
        Self {
            id: product.id.clone(),
            title: product.title.clone(),
            category: product.product_type.clone(),
            price: product
                .price
                .as_ref()
                .map(crate::shopify::Money::display)
                .unwrap_or_default(),
            image_url: product.featured_image.as_ref().map(|i| i.url.clone()),
            visible_tags: product.tags.iter().take(VISIBLE_TAGS).cloned().collect(),
            hidden_tag_count: product.tags.len().saturating_sub(VISIBLE_TAGS),
            score: latest.map(|v| v.score),
        }
    }

    /// Score band; never-optimized products need improvement.
    #[must_use]
    pub fn band(&self) -> ScoreBand {
        self.score.map_or(ScoreBand::NeedsImprovement, Score::band)
    }

    /// Score for the score bar, zero if never optimized.
    #[must_use]
    pub fn score_value(&self) -> u8 {
        self.score.map_or(0, Score::value)
    }
}

/// Summary cards above product lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductStats {
    pub total: usize,
    pub needs_improvement: usize,
    pub improved: usize,
    /// Rounded mean score of optimized products; `None` if none are.
    pub average_score: Option<u8>,
}

impl ProductStats {
    #[must_use]
    pub fn from_rows(rows: &[ProductRow]) -> Self {
        let scores: Vec<u32> = rows
            .iter()
            .filter_map(|r| r.score.map(|s| u32::from(s.value())))
            .collect();

        let average_score = u32::try_from(scores.len())
            .ok()
            .filter(|count| *count > 0)
            .map(|count| {
                let sum: u32 = scores.iter().sum();
                u8::try_from((sum + count / 2) / count).unwrap_or(u8::MAX)
            });

        Self {
            total: rows.len(),
            needs_improvement: rows
                .iter()
                .filter(|r| r.band() == ScoreBand::NeedsImprovement)
                .count(),
            improved: rows.iter().filter(|r| r.band() == ScoreBand::Improved).count(),
            average_score,
        }
    }
}

/// Rows for `products`, joined with their latest versions.
///
/// A failed version lookup degrades to rows without scores.
pub async fn product_rows(state: &AppState, shop: &str, products: &[Product]) -> Vec<ProductRow> {
    let ids: Vec<String> = products.iter().map(|p| p.id.clone()).collect();
    let latest = match ProductVersionRepository::new(state.pool())
        .latest_for_products(shop, &ids)
        .await
    {
        Ok(latest) => latest,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load latest versions");
            HashMap::new()
        }
    };

    products
        .iter()
        .map(|p| ProductRow::new(p, latest.get(&p.id)))
        .collect()
}

/// A stored version for the history list.
#[derive(Debug, Clone)]
pub struct VersionView {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub score: Score,
    pub status: VersionStatus,
    pub created_at: String,
}

impl From<&ProductVersion> for VersionView {
    fn from(version: &ProductVersion) -> Self {
        Self {
            title: version.title.clone(),
            description: version.description.clone(),
            tags: version.tag_list(),
            score: version.score,
            status: version.status,
            created_at: version.created_at.format("%d/%m/%Y %H:%M").to_string(),
        }
    }
}

// =============================================================================
// Product Table
// =============================================================================

/// Product table query parameters.
#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    pub host: Option<String>,
    /// Cursor of the last product on the previous page.
    pub after: Option<String>,
    /// Shopify product search query.
    pub q: Option<String>,
}

/// Product table template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub shell: Shell,
    pub products: Vec<ProductRow>,
    pub stats: ProductStats,
    pub next_cursor: Option<String>,
    pub search_query: String,
    pub error_message: Option<&'static str>,
}

impl ProductsIndexTemplate {
    /// Link to the next page, keeping the search.
    #[must_use]
    pub fn next_page_link(&self) -> Option<String> {
        let cursor = self.next_cursor.as_deref()?;
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("after", cursor);
        if !self.search_query.is_empty() {
            query.append_pair("q", &self.search_query);
        }
        Some(self.shell.link(&format!("/app/products?{}", query.finish())))
    }
}

/// GET /app/products - Product table.
#[instrument(skip(state, session, query), fields(shop = %session.shop))]
pub async fn index(
    session: ShopSession,
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Response {
    let shell = Shell::load(&state, &session, query.host.clone(), "/app/products").await;
    let search = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());

    let fetched = match state.admin_client(&session.shop, Some(&session.token)).await {
        Ok(client) => client
            .get_products(PAGE_SIZE, query.after.clone(), search.map(String::from))
            .await
            .map_err(crate::error::AppError::from),
        Err(e) => Err(e),
    };

    let (products, next_cursor, error_message) = match fetched {
        Ok(connection) => {
            let rows = product_rows(&state, &session.shop, &connection.products).await;
            let next = connection
                .page_info
                .has_next_page
                .then_some(connection.page_info.end_cursor)
                .flatten();
            (rows, next, None)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch products");
            (vec![], None, Some(SHOPIFY_ERROR_MESSAGE))
        }
    };

    ProductsIndexTemplate {
        shell,
        stats: ProductStats::from_rows(&products),
        products,
        next_cursor,
        search_query: search.unwrap_or_default().to_string(),
        error_message,
    }
    .into_response()
}

// =============================================================================
// Product Detail
// =============================================================================

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub shell: Shell,
    pub product: Product,
    pub row: ProductRow,
    pub versions: Vec<VersionView>,
    pub current: Option<VersionView>,
    pub tones: [Tone; 4],
    pub detail_levels: [DetailLevel; 3],
    pub focus_areas: [FocusArea; 3],
}

/// Page shown when a product cannot be displayed.
#[derive(Template, WebTemplate)]
#[template(path = "products/missing.html")]
pub struct ProductMissingTemplate {
    pub shell: Shell,
    pub message: &'static str,
}

/// GET /app/products/{id} - Product detail, version history and the
/// optimization dialog.
#[instrument(skip(state, session, query), fields(shop = %session.shop))]
pub async fn show(
    session: ShopSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<super::EmbeddedQuery>,
) -> Response {
    let shell = Shell::load(&state, &session, query.host, "/app/products").await;

    if !is_valid_product_id(&id) {
        let page = ProductMissingTemplate {
            shell,
            message: "מזהה מוצר לא תקין",
        };
        return (StatusCode::BAD_REQUEST, page).into_response();
    }

    let fetched = match state.admin_client(&session.shop, Some(&session.token)).await {
        Ok(client) => client
            .get_product(&id)
            .await
            .map_err(crate::error::AppError::from),
        Err(e) => Err(e),
    };

    let product = match fetched {
        Ok(Some(product)) => product,
        Ok(None) => {
            let page = ProductMissingTemplate {
                shell,
                message: "המוצר לא נמצא",
            };
            return (StatusCode::NOT_FOUND, page).into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch product");
            let page = ProductMissingTemplate {
                shell,
                message: SHOPIFY_ERROR_MESSAGE,
            };
            return (StatusCode::BAD_GATEWAY, page).into_response();
        }
    };

    let versions = match ProductVersionRepository::new(state.pool())
        .list_for_product(&session.shop, &product_gid(&id))
        .await
    {
        Ok(versions) => versions,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load versions");
            vec![]
        }
    };

    let current = versions
        .iter()
        .rev()
        .find(|v| v.status == VersionStatus::Current)
        .map(VersionView::from);

    ProductShowTemplate {
        shell,
        row: ProductRow::new(&product, versions.last()),
        versions: versions.iter().map(VersionView::from).collect(),
        current,
        product,
        tones: Tone::ALL,
        detail_levels: DetailLevel::ALL,
        focus_areas: FocusArea::ALL,
    }
    .into_response()
}

#[cfg(test)]
mod tests {
    use crate::shopify::{Image, Money};

    use super::*;

    fn product(tags: &[&str]) -> Product {
        Product {
            id: "gid://shopify/Product/1".to_string(),
            title: "חולצה".to_string(),
            description: String::new(),
            description_html: None,
            handle: "shirt".to_string(),
            product_type: "בגדים".to_string(),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            featured_image: Some(Image {
                url: "https://cdn.shopify.com/a.jpg".to_string(),
                alt_text: None,
            }),
            price: Some(Money {
                amount: "79.9".to_string(),
                currency_code: "ILS".to_string(),
            }),
            online_store_url: None,
        }
    }

    fn row(score: Option<u8>) -> ProductRow {
        let mut row = ProductRow::new(&product(&[]), None);
        row.score = score.map(Score::new);
        row
    }

    #[test]
    fn test_row_collapses_tags() {
        let row = ProductRow::new(&product(&["a", "b", "c", "d", "e"]), None);
        assert_eq!(row.visible_tags, vec!["a", "b", "c"]);
        assert_eq!(row.hidden_tag_count, 2);
        assert_eq!(row.price, "₪79.9");
        assert_eq!(row.category, "בגדים");
    }

    #[test]
    fn test_unscored_row_needs_improvement() {
        let row = row(None);
        assert_eq!(row.band(), ScoreBand::NeedsImprovement);
        assert_eq!(row.score_value(), 0);
    }

    #[test]
    fn test_stats() {
        let rows = vec![row(None), row(Some(90)), row(Some(65)), row(Some(40))];
        let stats = ProductStats::from_rows(&rows);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.needs_improvement, 2);
        assert_eq!(stats.improved, 1);
        // (90 + 65 + 40) / 3 = 65
        assert_eq!(stats.average_score, Some(65));
    }

    #[test]
    fn test_stats_empty() {
        assert_eq!(ProductStats::from_rows(&[]), ProductStats::default());
    }
}
