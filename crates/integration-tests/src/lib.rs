//! Integration tests for Shopfloor.
//!
//! Tests build the full router over a [`MemoryStore`] and drive it with
//! `tower::ServiceExt::oneshot`, so no server or database is needed:
//!
//! ```bash
//! cargo test -p shopfloor-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use shopfloor_api::config::{ApiConfig, AuthConfig, MEMORY_DATABASE_URL};
use shopfloor_api::db::{CatalogStore, MemoryStore};
use shopfloor_api::models::{NewCategory, NewProduct, Product};
use shopfloor_api::services::TokenIssuer;
use shopfloor_api::state::AppState;
use shopfloor_core::{CategoryId, Price, UserId};

/// Signing secret used by every test app.
pub const JWT_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

/// Password used for every registered test user.
pub const PASSWORD: &str = "correct horse battery";

/// A running app and direct access to its store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    /// Fresh app with no users. User 1 is on the admin allow-list.
    #[must_use]
    pub fn new() -> Self {
        Self::with_admins(vec![UserId::new(1)])
    }

    #[must_use]
    pub fn with_admins(admin_ids: Vec<UserId>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config(admin_ids), store.clone());

        Self {
            router: shopfloor_api::app(state),
            store,
        }
    }

    /// Send a request and return the status and parsed JSON body
    /// (`Value::Null` for an empty or non-JSON body).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// `POST /cart/add` as the holder of `token`.
    pub async fn add_to_cart(
        &self,
        token: &str,
        product_id: i32,
        quantity: i64,
    ) -> (StatusCode, Value) {
        let body = json!({ "product_id": product_id, "quantity": quantity });
        self.post("/cart/add", Some(token), body).await
    }

    /// `PUT /cart/decrement` as the holder of `token`.
    pub async fn decrement(&self, token: &str, product_id: i32) -> (StatusCode, Value) {
        let body = json!({ "product_id": product_id });
        self.put("/cart/decrement", Some(token), body).await
    }

    /// Register a user through the API and return their ID.
    pub async fn register(&self, name: &str, email: &str, phone: &str) -> UserId {
        let (status, body) = self
            .post(
                "/users/",
                None,
                json!({ "name": name, "email": email, "phone": phone, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        UserId::new(i32::try_from(body["user_id"].as_i64().unwrap()).unwrap())
    }

    /// Log in through the API and return the bearer token.
    pub async fn login(&self, identifier: &str) -> String {
        let (status, body) = self
            .post(
                "/users/login",
                None,
                json!({ "identifier": identifier, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["token_type"], "bearer");
        body["access_token"].as_str().unwrap().to_owned()
    }

    /// Register and log in; returns the user ID and token.
    pub async fn shopper(&self, name: &str, email: &str, phone: &str) -> (UserId, String) {
        let id = self.register(name, email, phone).await;
        (id, self.login(email).await)
    }

    /// Insert a category with `count` products straight into the store.
    /// Product `i` (1-based) costs `i` × 1.25.
    pub async fn seed_products(&self, count: i64) -> (CategoryId, Vec<Product>) {
        let category = self
            .store
            .create_category(&NewCategory {
                name: "Tea".to_owned(),
                description: None,
                image_url: None,
            })
            .await
            .unwrap();

        let mut products = Vec::new();
        for i in 1..=count {
            let product = self
                .store
                .create_product(&NewProduct {
                    name: format!("Tea #{i}"),
                    description: None,
                    price: Price::new(Decimal::new(125 * i, 2)).unwrap(),
                    image_url: None,
                    category_id: category.id,
                })
                .await
                .unwrap();
            products.push(product);
        }

        (category.id, products)
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for a test app: in-memory store, no rate limiting.
#[must_use]
pub fn config(admin_ids: Vec<UserId>) -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from(MEMORY_DATABASE_URL.to_owned()),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        auth: AuthConfig {
            jwt_secret: SecretString::from(JWT_SECRET.to_owned()),
            token_ttl: chrono::Duration::minutes(30),
            admin_ids,
        },
        db_timeout: Duration::from_secs(5),
        rate_limit: false,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// An issuer sharing the test secret, with a custom lifetime.
#[must_use]
pub fn issuer_with_ttl(ttl: chrono::Duration) -> TokenIssuer {
    TokenIssuer::new(&SecretString::from(JWT_SECRET.to_owned()), ttl)
}
