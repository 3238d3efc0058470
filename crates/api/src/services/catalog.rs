//! Catalog reads and admin writes.

use rust_decimal::Decimal;
use thiserror::Error;

use shopfloor_core::{CategoryId, Price, PriceError, ProductId, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::{Category, NewCategory, NewProduct, Product};

/// Maximum length of product and category names.
const MAX_NAME_LENGTH: usize = 200;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Name empty or too long.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Price not positive, too precise, or too large.
    #[error("invalid price: {0}")]
    InvalidPrice(#[from] PriceError),

    /// No such product.
    #[error("product not found")]
    ProductNotFound,

    /// No such category.
    #[error("category not found")]
    CategoryNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Category fields as submitted by an admin.
#[derive(Debug, Clone)]
pub struct CategoryDraft {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Product fields as submitted by an admin.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub category_id: CategoryId,
}

/// A product together with how many of it the caller has in their cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductListing {
    pub product: Product,
    pub cart_quantity: u32,
}

/// Catalog operations for one store.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// All categories.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.store.list_categories().await?)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidName` for an empty or oversized name.
    pub async fn create_category(&self, draft: CategoryDraft) -> Result<Category, CatalogError> {
        let category = self
            .store
            .create_category(&NewCategory {
                name: validate_name(&draft.name)?,
                description: non_blank(draft.description),
                image_url: non_blank(draft.image_url),
            })
            .await?;

        tracing::info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    /// Products (optionally of one category) annotated with `user_id`'s cart
    /// quantities.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn products_for(
        &self,
        user_id: UserId,
        category: Option<CategoryId>,
    ) -> Result<Vec<ProductListing>, CatalogError> {
        let products = self.store.list_products(category).await?;
        let quantities = self.store.quantities(user_id).await?;

        Ok(products
            .into_iter()
            .map(|product| ProductListing {
                cart_quantity: quantities.get(&product.id).copied().unwrap_or(0),
                product,
            })
            .collect())
    }

    /// One product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` for an unknown ID.
    pub async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.store
            .product_by_id(id)
            .await?
            .ok_or(CatalogError::ProductNotFound)
    }

    /// Create a product in an existing category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidName` or `CatalogError::InvalidPrice`
    /// for bad input and `CatalogError::CategoryNotFound` if the category
    /// does not exist. Nothing is written on error.
    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product, CatalogError> {
        let product = NewProduct {
            name: validate_name(&draft.name)?,
            description: non_blank(draft.description),
            price: Price::new(draft.price)?,
            image_url: non_blank(draft.image_url),
            category_id: draft.category_id,
        };

        let product = self
            .store
            .create_product(&product)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::CategoryNotFound,
                other => CatalogError::Repository(other),
            })?;

        tracing::info!(
            product_id = %product.id,
            category_id = %product.category_id,
            "product created"
        );
        Ok(product)
    }
}

fn validate_name(name: &str) -> Result<String, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::InvalidName("name must not be empty".to_owned()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(CatalogError::InvalidName(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_owned())
}

/// Blank optional text is stored as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
