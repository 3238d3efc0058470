//! Cart aggregation.
//!
//! Each `(user, product)` pair is either absent or present with a positive
//! quantity. Adding moves `absent → present(q)` or `present(q) → present(q + n)`;
//! decrementing moves `present(q) → present(q - 1)` and `present(1) → absent`;
//! removing moves any `present(q) → absent`.

use thiserror::Error;

use shopfloor_core::{ProductId, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::{CartItem, Decremented};

/// Largest quantity accepted in one add request.
pub const MAX_ADD_QUANTITY: i64 = 1000;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity not in `1..=MAX_ADD_QUANTITY`.
    #[error("quantity must be between 1 and {MAX_ADD_QUANTITY}")]
    InvalidQuantity,

    /// No such product.
    #[error("product not found")]
    ProductNotFound,

    /// The product is not in the cart.
    #[error("product not in cart")]
    LineNotFound,

    /// The cart has no lines.
    #[error("cart is empty")]
    Empty,

    /// The line would exceed the largest storable quantity.
    #[error("cart quantity limit reached")]
    QuantityLimit,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result of a decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecrementOutcome {
    /// Still in the cart with one fewer unit.
    Updated(CartItem),
    /// The last unit was taken off and the line is gone.
    Removed(ProductId),
}

/// Cart operations for one store.
pub struct CartService<'a> {
    store: &'a dyn Store,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Add `quantity` units of a product.
    ///
    /// The first add snapshots the product's current price; later adds keep
    /// it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a quantity outside
    /// `1..=MAX_ADD_QUANTITY`, `CartError::ProductNotFound` for an unknown
    /// product and `CartError::QuantityLimit` if the line is already full.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartItem, CartError> {
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| (1..=MAX_ADD_QUANTITY).contains(&i64::from(*q)))
            .ok_or(CartError::InvalidQuantity)?;

        let product = self
            .store
            .product_by_id(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;

        let line = self
            .store
            .add_line(user_id, &product, quantity)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CartError::ProductNotFound,
                RepositoryError::Conflict(_) => CartError::QuantityLimit,
                other => CartError::Repository(other),
            })?;

        tracing::debug!(%user_id, %product_id, quantity = line.quantity, "cart line added");
        Ok(CartItem {
            line,
            name: product.name,
            image_url: product.image_url,
        })
    }

    /// Take one unit off a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if the product is not in the cart.
    pub async fn decrement(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<DecrementOutcome, CartError> {
        let outcome = self
            .store
            .decrement_line(user_id, product_id)
            .await?
            .ok_or(CartError::LineNotFound)?;

        match outcome {
            Decremented::Removed => {
                tracing::debug!(%user_id, %product_id, "cart line removed by decrement");
                Ok(DecrementOutcome::Removed(product_id))
            }
            Decremented::Updated(line) => {
                let product = self
                    .store
                    .product_by_id(product_id)
                    .await?
                    .ok_or(CartError::ProductNotFound)?;
                Ok(DecrementOutcome::Updated(CartItem {
                    line,
                    name: product.name,
                    image_url: product.image_url,
                }))
            }
        }
    }

    /// Remove a line regardless of its quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if the product is not in the cart.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), CartError> {
        if self.store.remove_line(user_id, product_id).await? {
            tracing::debug!(%user_id, %product_id, "cart line removed");
            Ok(())
        } else {
            Err(CartError::LineNotFound)
        }
    }

    /// Every line in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Empty` if there are none.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<CartItem>, CartError> {
        let items = self.store.list_items(user_id).await?;
        if items.is_empty() {
            return Err(CartError::Empty);
        }
        Ok(items)
    }
}
