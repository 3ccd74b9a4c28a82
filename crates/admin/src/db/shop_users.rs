//! Per-shop plan and token balance.
//!
//! Token consumption is a single conditional `UPDATE`, so concurrent paid
//! requests for the same shop can never drive the balance below zero.

use chrono::{DateTime, Utc};
use product_optimizer_core::{ShopUserId, SubscriptionPlan};
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;

// =============================================================================
// Types
// =============================================================================

/// A shop's plan and remaining tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShopUser {
    pub id: ShopUserId,
    pub shop: String,
    pub plan: Option<SubscriptionPlan>,
    pub tokens: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ShopUserRow {
    id: ShopUserId,
    shop: String,
    plan: Option<SubscriptionPlan>,
    tokens: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ShopUserRow> for ShopUser {
    fn from(row: ShopUserRow) -> Self {
        Self {
            id: row.id,
            shop: row.shop,
            plan: row.plan,
            tokens: row.tokens,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for shop plans and token balances.
pub struct ShopUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShopUserRepository<'a> {
    /// Create a new shop user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the record for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn get_by_shop(&self, shop: &str) -> Result<Option<ShopUser>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopUserRow>(
            r"
            SELECT id, shop, plan, tokens, created_at, updated_at
            FROM optimizer.shop_user
            WHERE shop = $1
            ",
        )
        .bind(shop)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ShopUser::from))
    }

    /// Current token balance; zero for shops without a record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn token_balance(&self, shop: &str) -> Result<i32, RepositoryError> {
        Ok(self.get_by_shop(shop).await?.map_or(0, |user| user.tokens))
    }

    /// Consume one token.
    ///
    /// Returns the remaining balance, or `None` when the shop has no tokens
    /// left (or no record at all).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn consume_token(&self, shop: &str) -> Result<Option<i32>, RepositoryError> {
        let remaining = sqlx::query_scalar::<_, i32>(
            r"
            UPDATE optimizer.shop_user
            SET tokens = tokens - 1, updated_at = NOW()
            WHERE shop = $1 AND tokens > 0
            RETURNING tokens
            ",
        )
        .bind(shop)
        .fetch_optional(self.pool)
        .await?;

        Ok(remaining)
    }

    /// Return a token taken by [`Self::consume_token`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the shop has no record.
    #[instrument(skip(self))]
    pub async fn refund_token(&self, shop: &str) -> Result<i32, RepositoryError> {
        sqlx::query_scalar::<_, i32>(
            r"
            UPDATE optimizer.shop_user
            SET tokens = tokens + 1, updated_at = NOW()
            WHERE shop = $1
            RETURNING tokens
            ",
        )
        .bind(shop)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Record an active plan and grant its tokens.
    ///
    /// Switching plans adds the grant to the existing balance. Re-activating
    /// the current plan only tops the balance up to the grant, so repeated
    /// billing confirmations are idempotent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    #[instrument(skip(self))]
    pub async fn activate_plan(
        &self,
        shop: &str,
        plan: SubscriptionPlan,
        tokens: i32,
    ) -> Result<ShopUser, RepositoryError> {
        let row = sqlx::query_as::<_, ShopUserRow>(
            r"
            INSERT INTO optimizer.shop_user (shop, plan, tokens)
            VALUES ($1, $2, $3)
            ON CONFLICT (shop) DO UPDATE SET
                tokens = CASE
                    WHEN optimizer.shop_user.plan IS DISTINCT FROM EXCLUDED.plan
                        THEN optimizer.shop_user.tokens + EXCLUDED.tokens
                    ELSE GREATEST(optimizer.shop_user.tokens, EXCLUDED.tokens)
                END,
                plan = EXCLUDED.plan,
                updated_at = NOW()
            RETURNING id, shop, plan, tokens, created_at, updated_at
            ",
        )
        .bind(shop)
        .bind(plan)
        .bind(tokens)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Add tokens to a shop, creating the record if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    #[instrument(skip(self))]
    pub async fn grant_tokens(&self, shop: &str, amount: i32) -> Result<ShopUser, RepositoryError> {
        let row = sqlx::query_as::<_, ShopUserRow>(
            r"
            INSERT INTO optimizer.shop_user (shop, tokens)
            VALUES ($1, $2)
            ON CONFLICT (shop) DO UPDATE SET
                tokens = optimizer.shop_user.tokens + EXCLUDED.tokens,
                updated_at = NOW()
            RETURNING id, shop, plan, tokens, created_at, updated_at
            ",
        )
        .bind(shop)
        .bind(amount)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Delete a shop's record and version history (`shop/redact`).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the deletes fail.
    #[instrument(skip(self))]
    pub async fn delete_shop_data(&self, shop: &str) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM optimizer.product_version WHERE shop = $1")
            .bind(shop)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM optimizer.shop_user WHERE shop = $1")
            .bind(shop)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
