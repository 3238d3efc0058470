//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                     - Liveness
//! GET    /health/ready               - Readiness (pings the store)
//!
//! # Accounts
//! POST   /users/                     - Register
//! POST   /users/login                - Log in with email or phone, get a bearer token
//! GET    /profile/                   - Current user (token)
//!
//! # Catalog
//! GET    /categories/                - List categories
//! POST   /categories/                - Create category (admin)
//! GET    /products/                  - List products with cart quantities (token)
//! GET    /products/{product_id}      - One product (token)
//! POST   /products/                  - Create product (admin)
//!
//! # Cart (token)
//! POST   /cart/add                   - Add units of a product
//! GET    /cart/                      - List lines
//! PUT    /cart/decrement             - Take one unit off a line
//! DELETE /cart/remove/{product_id}   - Remove a line
//! ```
//!
//! Paths are registered exactly as listed, trailing slashes included.

pub mod cart;
pub mod catalog;
pub mod health;
pub mod users;

use std::time::Duration;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::error::AppError;
use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// JSON body extractor whose rejections render as `{"detail": ...}` (400).
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections render as `{"detail": ...}` (400).
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query extractor whose rejections render as `{"detail": ...}` (400).
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Registration and login.
fn account_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/users/", post(users::register))
        .route("/users/login", post(users::login));

    if rate_limit {
        router.layer(auth_rate_limiter())
    } else {
        router
    }
}

/// Everything else under the API.
fn api_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/profile/", get(users::profile))
        .route(
            "/categories/",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/products/",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route("/products/{product_id}", get(catalog::show_product))
        .route("/cart/", get(cart::list))
        .route("/cart/add", post(cart::add))
        .route("/cart/decrement", put(cart::decrement))
        .route("/cart/remove/{product_id}", delete(cart::remove));

    if rate_limit {
        router.layer(api_rate_limiter())
    } else {
        router
    }
}

/// Create all routes for the API.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(account_routes(rate_limit))
        .merge(api_routes(rate_limit))
}

/// Build the complete application: routes, middleware and state.
pub fn app(state: AppState) -> Router {
    let rate_limit = state.config().rate_limit;

    routes(rate_limit)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
