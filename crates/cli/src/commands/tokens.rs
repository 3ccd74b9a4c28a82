//! Token balance commands.
//!
//! # Usage
//!
//! ```bash
//! po-cli tokens show --shop demo.myshopify.com
//! po-cli tokens grant --shop demo.myshopify.com --amount 10
//! ```

use product_optimizer_admin::db::{RepositoryError, ShopUserRepository};
use product_optimizer_admin::shopify::normalize_shop_domain;
use thiserror::Error;

use super::{CommandError, connect};

/// Errors that can occur during token operations.
#[derive(Debug, Error)]
pub enum TokensError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Shop is not a `*.myshopify.com` domain.
    #[error("Invalid shop domain: {0}")]
    InvalidShop(String),

    /// Grant amount must be positive.
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(i32),
}

fn parse_shop(shop: &str) -> Result<String, TokensError> {
    normalize_shop_domain(shop).ok_or_else(|| TokensError::InvalidShop(shop.to_owned()))
}

/// Print a shop's plan and balance.
#[allow(clippy::print_stdout)]
pub async fn show(shop: &str) -> Result<(), TokensError> {
    let shop = parse_shop(shop)?;
    let pool = connect().await?;

    match ShopUserRepository::new(&pool).get_by_shop(&shop).await? {
        Some(user) => {
            let plan = user.plan.map_or("none", |p| p.name());
            println!("{shop}");
            println!("  plan:   {plan}");
            println!("  tokens: {}", user.tokens);
        }
        None => println!("{shop} has no record yet (0 tokens)"),
    }

    Ok(())
}

/// Add `amount` tokens to a shop.
pub async fn grant(shop: &str, amount: i32) -> Result<(), TokensError> {
    if amount <= 0 {
        return Err(TokensError::InvalidAmount(amount));
    }
    let shop = parse_shop(shop)?;
    let pool = connect().await?;

    let user = ShopUserRepository::new(&pool)
        .grant_tokens(&shop, amount)
        .await?;
    tracing::info!(shop = %shop, amount, balance = user.tokens, "Tokens granted");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shop() {
        assert_eq!(parse_shop("demo").unwrap(), "demo.myshopify.com");
        assert!(matches!(
            parse_shop("not a shop!"),
            Err(TokensError::InvalidShop(_))
        ));
    }
}
