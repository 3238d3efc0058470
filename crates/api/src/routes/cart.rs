//! Cart handlers. Every route acts on the token holder's own cart.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shopfloor_core::{Price, ProductId, serialize_amount};

use super::{ApiJson, ApiPath};
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::CartItem;
use crate::services::{CartService, DecrementOutcome};
use crate::state::AppState;

const fn one() -> i64 {
    1
}

/// Body of `POST /cart/add`.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i64,
}

/// Body of `PUT /cart/decrement`.
#[derive(Debug, Deserialize)]
pub struct DecrementRequest {
    pub product_id: ProductId,
}

/// One cart line as shown to the shopper.
#[derive(Debug, Serialize)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    /// Unit price captured when the line was created.
    pub price: Price,
    #[serde(serialize_with = "serialize_amount")]
    pub total: Decimal,
    pub image_url: Option<String>,
}

impl From<CartItem> for CartItemView {
    fn from(item: CartItem) -> Self {
        Self {
            product_id: item.line.product_id,
            name: item.name,
            quantity: item.line.quantity,
            price: item.line.price,
            total: item.line.total(),
            image_url: item.image_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub cart_items: Vec<CartItemView>,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub message: &'static str,
    pub product_id: ProductId,
}

/// Either the updated line or a removal notice.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DecrementResponse {
    Updated(CartItemView),
    Removed(RemovedResponse),
}

/// Add units of a product; creates the line on first add.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<AddToCartRequest>,
) -> Result<Json<CartItemView>> {
    let item = CartService::new(state.store())
        .add(user.id, body.product_id, body.quantity)
        .await?;
    Ok(Json(item.into()))
}

/// Every line in the caller's cart. An empty cart is a 404.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<CartResponse>> {
    let items = CartService::new(state.store()).list(user.id).await?;

    Ok(Json(CartResponse {
        status: "success",
        message: "Cart fetched successfully",
        cart_items: items.into_iter().map(CartItemView::from).collect(),
    }))
}

/// Take one unit off a line, removing it at zero.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn decrement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<DecrementRequest>,
) -> Result<Json<DecrementResponse>> {
    let outcome = CartService::new(state.store())
        .decrement(user.id, body.product_id)
        .await?;

    Ok(Json(match outcome {
        DecrementOutcome::Updated(item) => DecrementResponse::Updated(item.into()),
        DecrementOutcome::Removed(product_id) => DecrementResponse::Removed(RemovedResponse {
            message: "Product removed from cart",
            product_id,
        }),
    }))
}

/// Remove a line whatever its quantity.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<RemovedResponse>> {
    CartService::new(state.store())
        .remove(user.id, product_id)
        .await?;

    Ok(Json(RemovedResponse {
        message: "Product removed from cart",
        product_id,
    }))
}
