//! `PostgreSQL` catalog queries.

use async_trait::async_trait;
use sqlx::FromRow;

use shopfloor_core::{CategoryId, Price, ProductId};

use super::{CatalogStore, PgStore, RepositoryError, foreign_key_violation};
use crate::models::{Category, NewCategory, NewProduct, Product};

const PRODUCT_COLUMNS: &str = "id, name, description, price, image_url, category_id";

#[derive(FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    description: Option<String>,
    image_url: Option<String>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            image_url: row.image_url,
        }
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: Option<String>,
    price: Price,
    image_url: Option<String>,
    category_id: CategoryId,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            image_url: row.image_url,
            category_id: row.category_id,
        }
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = self
            .timed(async {
                sqlx::query_as::<_, CategoryRow>(
                    "SELECT id, name, description, image_url FROM categories ORDER BY id",
                )
                .fetch_all(self.pool())
                .await
                .map_err(RepositoryError::from)
            })
            .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn create_category(&self, category: &NewCategory) -> Result<Category, RepositoryError> {
        let row = self
            .timed(async {
                sqlx::query_as::<_, CategoryRow>(
                    r"
                    INSERT INTO categories (name, description, image_url)
                    VALUES ($1, $2, $3)
                    RETURNING id, name, description, image_url
                    ",
                )
                .bind(&category.name)
                .bind(&category.description)
                .bind(&category.image_url)
                .fetch_one(self.pool())
                .await
                .map_err(RepositoryError::from)
            })
            .await?;

        Ok(row.into())
    }

    async fn list_products(
        &self,
        category: Option<CategoryId>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE $1::INTEGER IS NULL OR category_id = $1 ORDER BY id"
        );
        let rows = self
            .timed(async {
                sqlx::query_as::<_, ProductRow>(&sql)
                    .bind(category)
                    .fetch_all(self.pool())
                    .await
                    .map_err(RepositoryError::from)
            })
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = self
            .timed(async {
                sqlx::query_as::<_, ProductRow>(&sql)
                    .bind(id)
                    .fetch_optional(self.pool())
                    .await
                    .map_err(RepositoryError::from)
            })
            .await?;

        Ok(row.map(Product::from))
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let sql = format!(
            "INSERT INTO products (name, description, price, image_url, category_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {PRODUCT_COLUMNS}"
        );
        let row = self
            .timed(async {
                sqlx::query_as::<_, ProductRow>(&sql)
                    .bind(&product.name)
                    .bind(&product.description)
                    .bind(product.price)
                    .bind(&product.image_url)
                    .bind(product.category_id)
                    .fetch_one(self.pool())
                    .await
                    .map_err(|e| {
                        if foreign_key_violation(&e) {
                            RepositoryError::NotFound
                        } else {
                            RepositoryError::Database(e)
                        }
                    })
            })
            .await?;

        Ok(row.into())
    }
}
