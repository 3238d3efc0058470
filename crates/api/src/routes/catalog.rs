//! Category and product handlers.
//!
//! Categories are public to read. Products need a token to read, since each
//! listing carries the caller's cart quantity. Both need an admin token to
//! create.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shopfloor_core::{CategoryId, ProductId};

use super::{ApiJson, ApiPath, ApiQuery};
use crate::error::Result;
use crate::middleware::{CurrentUser, RequireAdmin};
use crate::models::{Category, Product};
use crate::services::{CatalogService, CategoryDraft, ProductDraft, ProductListing};
use crate::state::AppState;

/// Body of `POST /categories/`.
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Body of `POST /products/`.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub category_id: CategoryId,
}

/// Query of `GET /products/`.
#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    pub category_id: Option<CategoryId>,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize)]
pub struct CategoryCreatedResponse {
    pub message: &'static str,
    pub category: Category,
}

/// A product as listed to a shopper.
#[derive(Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub cart_quantity: u32,
}

impl From<ProductListing> for ProductView {
    fn from(listing: ProductListing) -> Self {
        Self {
            product: listing.product,
            cart_quantity: listing.cart_quantity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<ProductView>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub product: Product,
}

#[derive(Debug, Serialize)]
pub struct ProductCreatedResponse {
    pub message: &'static str,
    pub product: Product,
}

/// All categories.
#[instrument(skip(state))]
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<CategoriesResponse>> {
    let categories = CatalogService::new(state.store()).categories().await?;
    Ok(Json(CategoriesResponse { categories }))
}

/// Create a category.
#[instrument(skip(state, admin, body), fields(admin_id = %admin))]
pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<CreateCategoryRequest>,
) -> Result<Json<CategoryCreatedResponse>> {
    let category = CatalogService::new(state.store())
        .create_category(CategoryDraft {
            name: body.name,
            description: body.description,
            image_url: body.image_url,
        })
        .await?;

    Ok(Json(CategoryCreatedResponse {
        message: "Category added successfully",
        category,
    }))
}

/// Products, optionally filtered by `?category_id=`, with the caller's cart
/// quantities.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_products(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<ProductsQuery>,
) -> Result<Json<ProductsResponse>> {
    let listings = CatalogService::new(state.store())
        .products_for(user.id, query.category_id)
        .await?;

    Ok(Json(ProductsResponse {
        products: listings.into_iter().map(ProductView::from).collect(),
    }))
}

/// One product.
#[instrument(skip(state, _user))]
pub async fn show_product(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<ProductResponse>> {
    let product = CatalogService::new(state.store()).product(product_id).await?;
    Ok(Json(ProductResponse { product }))
}

/// Create a product in an existing category.
#[instrument(skip(state, admin, body), fields(admin_id = %admin, category_id = %body.category_id))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<CreateProductRequest>,
) -> Result<Json<ProductCreatedResponse>> {
    let product = CatalogService::new(state.store())
        .create_product(ProductDraft {
            name: body.name,
            description: body.description,
            price: body.price,
            image_url: body.image_url,
            category_id: body.category_id,
        })
        .await?;

    Ok(Json(ProductCreatedResponse {
        message: "Product added successfully",
        product,
    }))
}
