//! Product version history.
//!
//! Versions are append-only. Appends for one product are serialized with a
//! transaction-scoped advisory lock and stamped with `clock_timestamp()` after
//! the lock is held, so `(created_at, id)` is a total order per product.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use product_optimizer_core::{ProductVersionId, Score, VersionStatus};
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;

// =============================================================================
// Types
// =============================================================================

/// A stored snapshot of a product's optimized fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVersion {
    pub id: ProductVersionId,
    pub product_id: String,
    pub title: String,
    pub description: String,
    /// Comma-joined tag list, as stored.
    pub tags: String,
    pub score: Score,
    pub status: VersionStatus,
    pub created_at: DateTime<Utc>,
}

impl ProductVersion {
    /// Tags split back into a list.
    #[must_use]
    pub fn tag_list(&self) -> Vec<String> {
        split_tags(&self.tags)
    }
}

/// Fields for a new version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProductVersion {
    pub product_id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub score: Score,
    pub status: VersionStatus,
}

/// Internal row type for `PostgreSQL` queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductVersionRow {
    id: ProductVersionId,
    product_id: String,
    title: String,
    description: String,
    tags: String,
    score: i16,
    status: VersionStatus,
    created_at: DateTime<Utc>,
}

impl From<ProductVersionRow> for ProductVersion {
    fn from(row: ProductVersionRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            title: row.title,
            description: row.description,
            tags: row.tags,
            score: Score::saturating_from(i64::from(row.score)),
            status: row.status,
            created_at: row.created_at,
        }
    }
}

/// Join tags for storage, trimming each and dropping empties.
///
/// A tag containing a comma is stored as the separate tags it reads back as.
#[must_use]
pub fn join_tags(tags: &[String]) -> String {
    tags.iter()
        .flat_map(|t| t.split(','))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a stored comma-joined tag string.
#[must_use]
pub fn split_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

const SELECT_COLUMNS: &str =
    "id, product_id, title, description, tags, score, status, created_at";

// =============================================================================
// Repository
// =============================================================================

/// Repository for product version history.
pub struct ProductVersionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductVersionRepository<'a> {
    /// Create a new product version repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all versions of a product, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_for_product(
        &self,
        shop: &str,
        product_id: &str,
    ) -> Result<Vec<ProductVersion>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductVersionRow>(&format!(
            r"
            SELECT {SELECT_COLUMNS}
            FROM optimizer.product_version
            WHERE shop = $1 AND product_id = $2
            ORDER BY created_at ASC, id ASC
            "
        ))
        .bind(shop)
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ProductVersion::from).collect())
    }

    /// Get the current version of a product: the latest row marked `current`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn current_for_product(
        &self,
        shop: &str,
        product_id: &str,
    ) -> Result<Option<ProductVersion>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductVersionRow>(&format!(
            r"
            SELECT {SELECT_COLUMNS}
            FROM optimizer.product_version
            WHERE shop = $1 AND product_id = $2 AND status = 'current'
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "
        ))
        .bind(shop)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ProductVersion::from))
    }

    /// Latest version of each listed product, keyed by product ID.
    ///
    /// Products without any version are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, product_ids), fields(count = product_ids.len()))]
    pub async fn latest_for_products(
        &self,
        shop: &str,
        product_ids: &[String],
    ) -> Result<HashMap<String, ProductVersion>, RepositoryError> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, ProductVersionRow>(&format!(
            r"
            SELECT DISTINCT ON (product_id) {SELECT_COLUMNS}
            FROM optimizer.product_version
            WHERE shop = $1 AND product_id = ANY($2)
            ORDER BY product_id, created_at DESC, id DESC
            "
        ))
        .bind(shop)
        .bind(product_ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.product_id.clone(), ProductVersion::from(row)))
            .collect())
    }

    /// Append a version.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, version), fields(product_id = %version.product_id, status = %version.status))]
    pub async fn create(
        &self,
        shop: &str,
        version: &NewProductVersion,
    ) -> Result<ProductVersion, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("{shop}/{}", version.product_id))
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, ProductVersionRow>(&format!(
            r"
            INSERT INTO optimizer.product_version
                (shop, product_id, title, description, tags, score, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, clock_timestamp())
            RETURNING {SELECT_COLUMNS}
            "
        ))
        .bind(shop)
        .bind(&version.product_id)
        .bind(&version.title)
        .bind(&version.description)
        .bind(join_tags(&version.tags))
        .bind(i16::from(version.score))
        .bind(version.status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_tags_trims_and_drops_empty() {
        let tags = vec![" blue ".to_string(), String::new(), "shirt".to_string()];
        assert_eq!(join_tags(&tags), "blue,shirt");
    }

    #[test]
    fn test_join_tags_round_trips_embedded_commas() {
        let tags = vec!["blue, navy".to_string(), "shirt".to_string()];
        let stored = join_tags(&tags);
        assert_eq!(stored, "blue,navy,shirt");
        assert_eq!(split_tags(&stored), vec!["blue", "navy", "shirt"]);
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags("blue, shirt,,cotton "), vec!["blue", "shirt", "cotton"]);
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn test_product_version_serializes_camel_case() {
        let version = ProductVersion {
            id: ProductVersionId::new(1),
            product_id: "gid://shopify/Product/1".to_string(),
            title: "Blue Shirt".to_string(),
            description: "Soft cotton".to_string(),
            tags: "blue,shirt".to_string(),
            score: Score::new(85),
            status: VersionStatus::Current,
            created_at: DateTime::<Utc>::from_timestamp(0, 0).unwrap_or_default(),
        };

        let json = serde_json::to_value(&version).expect("serialize");
        assert_eq!(json["productId"], "gid://shopify/Product/1");
        assert_eq!(json["score"], 85);
        assert_eq!(json["status"], "current");
        assert!(json.get("createdAt").is_some());
        assert_eq!(version.tag_list(), vec!["blue", "shirt"]);
    }
}
