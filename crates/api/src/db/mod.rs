//! Persistence for users, catalog and cart lines.
//!
//! # Stores
//!
//! Handlers and services talk to a [`Store`], which bundles three traits:
//!
//! - [`UserStore`] - accounts and password hashes (`users`)
//! - [`CatalogStore`] - `categories` and `products`
//! - [`CartStore`] - `cart_lines`, one row per `(user_id, product_id)`
//!
//! Two implementations exist: [`PgStore`] for `PostgreSQL` and
//! [`MemoryStore`] for tests and throwaway local runs.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p shopfloor-cli -- migrate
//! ```

pub mod cart;
pub mod catalog;
pub mod memory;
pub mod users;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use shopfloor_core::{CategoryId, Email, Phone, ProductId, UserId};

use crate::models::{
    CartItem, CartLine, Category, Decremented, NewCategory, NewProduct, NewUser, Product, User,
};

pub use memory::MemoryStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A referenced entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The store did not answer within the configured deadline.
    #[error("store timed out")]
    Timeout,
}

impl RepositoryError {
    /// Whether the error means the store is unreachable or overloaded rather
    /// than broken. Dropped or refused connections count as unreachable.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Timeout
                | Self::Database(
                    sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
                )
        )
    }
}

/// Accounts and credentials.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user.
    ///
    /// Fails with `RepositoryError::Conflict` if the email or phone is taken;
    /// no row is written in that case.
    async fn create_user(&self, user: &NewUser) -> Result<User, RepositoryError>;

    /// Load a user by ID.
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Load a user and their password hash by email.
    async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Load a user and their password hash by phone.
    async fn credentials_by_phone(
        &self,
        phone: &Phone,
    ) -> Result<Option<(User, String)>, RepositoryError>;
}

/// Categories and products.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All categories, ordered by ID.
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    /// Insert a category.
    async fn create_category(&self, category: &NewCategory) -> Result<Category, RepositoryError>;

    /// All products, optionally restricted to one category, ordered by ID.
    async fn list_products(
        &self,
        category: Option<CategoryId>,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Load a product by ID.
    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Insert a product.
    ///
    /// Fails with `RepositoryError::NotFound` if the category does not exist;
    /// no row is written in that case.
    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError>;
}

/// Cart lines.
///
/// `add_line` and `decrement_line` are atomic per `(user, product)`:
/// concurrent calls serialize and never lose an update.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Create the line with `quantity` at the product's current price, or add
    /// `quantity` to an existing line (keeping its original price).
    ///
    /// Fails with `RepositoryError::NotFound` if the product disappeared and
    /// with `RepositoryError::Conflict` if the new quantity would not fit the
    /// column; the line is unchanged in both cases.
    async fn add_line(
        &self,
        user_id: UserId,
        product: &Product,
        quantity: u32,
    ) -> Result<CartLine, RepositoryError>;

    /// Take one unit off a line, deleting it when it reaches zero.
    ///
    /// Returns `None` when the line does not exist.
    async fn decrement_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<Decremented>, RepositoryError>;

    /// Delete a line regardless of quantity. Returns whether it existed.
    async fn remove_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError>;

    /// All lines of a user joined with product name and image, ordered by
    /// product ID.
    async fn list_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError>;

    /// Quantity per product for a user.
    async fn quantities(&self, user_id: UserId)
    -> Result<HashMap<ProductId, u32>, RepositoryError>;
}

/// Everything the API needs from persistence.
#[async_trait]
pub trait Store: UserStore + CatalogStore + CartStore {
    /// Cheap round trip used by the readiness check.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// `PostgreSQL`-backed [`Store`].
///
/// Every call is bounded by `timeout`, on top of the pool's acquire timeout.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgStore {
    /// Wrap a pool.
    #[must_use]
    pub const fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run a store call under the per-call deadline.
    ///
    /// Dropping the future on timeout aborts the in-flight query and returns
    /// its connection (rolling back any open transaction).
    async fn timed<T, F>(&self, fut: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))) | Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "store call timed out");
                Err(RepositoryError::Timeout)
            }
            Ok(result) => result,
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.timed(async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok::<_, RepositoryError>(())
        })
        .await
    }
}

/// Name of the violated constraint, if `e` is a unique violation.
fn unique_violation(e: &sqlx::Error) -> Option<&str> {
    if let sqlx::Error::Database(db_err) = e
        && db_err.is_unique_violation()
    {
        return Some(db_err.constraint().unwrap_or_default());
    }
    None
}

/// Whether the error is a foreign key violation.
fn foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

/// Whether the error is an arithmetic overflow on a numeric column.
fn numeric_out_of_range(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("22003"))
}

/// Convert a stored quantity into the domain type.
fn quantity_from_db(quantity: i32) -> Result<u32, RepositoryError> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| RepositoryError::DataCorruption(format!("invalid quantity {quantity}")))
}

/// Convert a domain quantity into the column type.
fn quantity_to_db(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::Conflict(format!("quantity {quantity} out of range")))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `acquire_timeout` - How long a caller may wait for a free connection
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    acquire_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(acquire_timeout)
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_quantity_conversions() {
        assert!(matches!(quantity_from_db(3), Ok(3)));
        assert!(matches!(
            quantity_from_db(0),
            Err(RepositoryError::DataCorruption(_))
        ));
        assert!(matches!(
            quantity_from_db(-2),
            Err(RepositoryError::DataCorruption(_))
        ));
        assert!(matches!(quantity_to_db(5), Ok(5)));
        assert!(quantity_to_db(u32::MAX).is_err());
    }

    #[test]
    fn test_unavailable_classification() {
        assert!(RepositoryError::Timeout.is_unavailable());
        assert!(RepositoryError::Database(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(!RepositoryError::NotFound.is_unavailable());
        assert!(!RepositoryError::Database(sqlx::Error::RowNotFound).is_unavailable());

        let reset = std::io::Error::from(std::io::ErrorKind::ConnectionReset);
        let err = RepositoryError::Database(sqlx::Error::Io(reset));
        assert!(err.is_unavailable());
        assert_eq!(
            AppError::from(err).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    /// A server that accepts connections and never answers.
    async fn silent_server() -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_unresponsive_store_times_out() {
        let addr = silent_server().await;
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy(&format!("postgres://shop:shop@{addr}/shop"))
            .unwrap();
        let store = PgStore::new(pool, Duration::from_millis(300));

        let started = std::time::Instant::now();
        let err = store.ping().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Timeout), "{err}");
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(
            AppError::from(err).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let err = store
            .remove_line(UserId::new(1), ProductId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Timeout), "{err}");

        let err = store
            .decrement_line(UserId::new(1), ProductId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Timeout), "{err}");
    }
}
