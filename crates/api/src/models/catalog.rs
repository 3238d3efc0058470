//! Catalog domain types: categories and the products filed under them.

use serde::Serialize;

use shopfloor_core::{CategoryId, Price, ProductId};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Data needed to insert a category.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// A product. Always belongs to exactly one existing category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub image_url: Option<String>,
    pub category_id: CategoryId,
}

/// Data needed to insert a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub image_url: Option<String>,
    pub category_id: CategoryId,
}
