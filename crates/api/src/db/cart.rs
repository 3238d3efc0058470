//! `PostgreSQL` cart queries.
//!
//! Adding is a single upsert, so concurrent adds for the same line are
//! serialized by the primary key. Decrementing needs a read before the write
//! (update or delete), so it locks the row inside a transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::FromRow;

use shopfloor_core::{Price, ProductId, UserId};

use super::{
    CartStore, PgStore, RepositoryError, foreign_key_violation, numeric_out_of_range,
    quantity_from_db, quantity_to_db,
};
use crate::models::{CartItem, CartLine, Decremented, Product};

#[derive(FromRow)]
struct CartLineRow {
    user_id: UserId,
    product_id: ProductId,
    quantity: i32,
    price: Price,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: row.user_id,
            product_id: row.product_id,
            quantity: quantity_from_db(row.quantity)?,
            price: row.price,
        })
    }
}

#[derive(FromRow)]
struct CartItemRow {
    #[sqlx(flatten)]
    line: CartLineRow,
    name: String,
    image_url: Option<String>,
}

#[async_trait]
impl CartStore for PgStore {
    async fn add_line(
        &self,
        user_id: UserId,
        product: &Product,
        quantity: u32,
    ) -> Result<CartLine, RepositoryError> {
        let quantity = quantity_to_db(quantity)?;
        let row = self
            .timed(async {
                sqlx::query_as::<_, CartLineRow>(
                    r"
                    INSERT INTO cart_lines (user_id, product_id, quantity, price)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (user_id, product_id)
                    DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity
                    RETURNING user_id, product_id, quantity, price
                    ",
                )
                .bind(user_id)
                .bind(product.id)
                .bind(quantity)
                .bind(product.price)
                .fetch_one(self.pool())
                .await
                .map_err(|e| {
                    if foreign_key_violation(&e) {
                        RepositoryError::NotFound
                    } else if numeric_out_of_range(&e) {
                        RepositoryError::Conflict("cart quantity out of range".to_owned())
                    } else {
                        RepositoryError::Database(e)
                    }
                })
            })
            .await?;

        CartLine::try_from(row)
    }

    async fn decrement_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<Decremented>, RepositoryError> {
        self.timed(async {
            let mut tx = self.pool().begin().await?;

            let current: Option<i32> = sqlx::query_scalar(
                r"
                SELECT quantity FROM cart_lines
                WHERE user_id = $1 AND product_id = $2
                FOR UPDATE
                ",
            )
            .bind(user_id)
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;

            // Dropping `tx` without commit rolls back
            let Some(current) = current else {
                return Ok(None);
            };

            let outcome = if current > 1 {
                let row = sqlx::query_as::<_, CartLineRow>(
                    r"
                    UPDATE cart_lines SET quantity = quantity - 1
                    WHERE user_id = $1 AND product_id = $2
                    RETURNING user_id, product_id, quantity, price
                    ",
                )
                .bind(user_id)
                .bind(product_id)
                .fetch_one(&mut *tx)
                .await?;
                Decremented::Updated(CartLine::try_from(row)?)
            } else {
                sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND product_id = $2")
                    .bind(user_id)
                    .bind(product_id)
                    .execute(&mut *tx)
                    .await?;
                Decremented::Removed
            };

            tx.commit().await?;
            Ok::<_, RepositoryError>(Some(outcome))
        })
        .await
    }

    async fn remove_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = self
            .timed(async {
                sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND product_id = $2")
                    .bind(user_id)
                    .bind(product_id)
                    .execute(self.pool())
                    .await
                    .map_err(RepositoryError::from)
            })
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = self
            .timed(async {
                sqlx::query_as::<_, CartItemRow>(
                    r"
                    SELECT c.user_id, c.product_id, c.quantity, c.price, p.name, p.image_url
                    FROM cart_lines c
                    JOIN products p ON p.id = c.product_id
                    WHERE c.user_id = $1
                    ORDER BY c.product_id
                    ",
                )
                .bind(user_id)
                .fetch_all(self.pool())
                .await
                .map_err(RepositoryError::from)
            })
            .await?;

        rows.into_iter()
            .map(|r| {
                Ok(CartItem {
                    line: CartLine::try_from(r.line)?,
                    name: r.name,
                    image_url: r.image_url,
                })
            })
            .collect()
    }

    async fn quantities(
        &self,
        user_id: UserId,
    ) -> Result<HashMap<ProductId, u32>, RepositoryError> {
        let rows: Vec<(ProductId, i32)> = self
            .timed(async {
                sqlx::query_as("SELECT product_id, quantity FROM cart_lines WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_all(self.pool())
                    .await
                    .map_err(RepositoryError::from)
            })
            .await?;

        rows.into_iter()
            .map(|(product_id, quantity)| Ok((product_id, quantity_from_db(quantity)?)))
            .collect()
    }
}
