//! Product reads and updates.

use tracing::instrument;

use super::{
    AdminClient, AdminShopifyError, UpdatedProduct,
    conversions::{convert_product, convert_product_connection},
    queries::{GetProduct, GetProducts, ProductUpdate, get_product, get_products, product_update},
};
use crate::shopify::{
    GraphQLError,
    types::{Product, ProductConnection, product_gid},
};

/// Fields to overwrite on a product. `None` leaves a field unchanged.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProductUpdateInput {
    pub title: Option<String>,
    pub description_html: Option<String>,
    /// Replaces all existing tags.
    pub tags: Option<Vec<String>>,
}

impl ProductUpdateInput {
    /// Whether the update would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.description_html.is_none() && self.tags.is_none()
    }
}

impl AdminClient {
    /// Get a page of products, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip(self), fields(shop = %self.shop()))]
    pub async fn get_products(
        &self,
        first: i64,
        after: Option<String>,
        query: Option<String>,
    ) -> Result<ProductConnection, AdminShopifyError> {
        let variables = get_products::Variables { first, after, query };

        let response = self.execute::<GetProducts>(variables).await?;

        Ok(convert_product_connection(response.products))
    }

    /// Get a product by GID or numeric ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip(self), fields(shop = %self.shop(), product_id = %id))]
    pub async fn get_product(&self, id: &str) -> Result<Option<Product>, AdminShopifyError> {
        let variables = get_product::Variables { id: product_gid(id) };

        let response = self.execute::<GetProduct>(variables).await?;

        Ok(response.product.map(convert_product))
    }

    /// Overwrite a product's title, description and tags.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::UserErrors` with Shopify's validation
    /// messages, or another error if the request fails.
    #[instrument(skip(self, input), fields(shop = %self.shop(), product_id = %id))]
    pub async fn update_product(
        &self,
        id: &str,
        input: ProductUpdateInput,
    ) -> Result<UpdatedProduct, AdminShopifyError> {
        let variables = product_update::Variables {
            product: product_update::ProductInput {
                id: product_gid(id),
                title: input.title,
                description_html: input.description_html,
                tags: input.tags,
            },
        };

        let response = self.execute::<ProductUpdate>(variables).await?;

        if let Some(payload) = response.product_update {
            if !payload.user_errors.is_empty() {
                return Err(AdminShopifyError::UserErrors(payload.user_errors));
            }

            if let Some(product) = payload.product {
                return Ok(product);
            }
        }

        Err(AdminShopifyError::GraphQL(vec![GraphQLError::message(
            "No product returned from update",
        )]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_input_is_empty() {
        assert!(ProductUpdateInput::default().is_empty());
        let input = ProductUpdateInput {
            tags: Some(Vec::new()),
            ..ProductUpdateInput::default()
        };
        assert!(!input.is_empty());
    }
}
