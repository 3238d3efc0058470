//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//! Every error body is JSON of the form `{"detail": "<message>"}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, CartError, CatalogError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Status when the store is unreachable, otherwise 500.
const fn repository_status(err: &RepositoryError) -> StatusCode {
    if err.is_unavailable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

const fn repository_message(err: &RepositoryError) -> &'static str {
    if err.is_unavailable() {
        "Service temporarily unavailable"
    } else {
        "Internal server error"
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(err)
            | Self::Auth(AuthError::Repository(err))
            | Self::Cart(CartError::Repository(err))
            | Self::Catalog(CatalogError::Repository(err)) => repository_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::Unauthenticated => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::Forbidden => StatusCode::FORBIDDEN,
                AuthError::UserAlreadyExists(_) => StatusCode::CONFLICT,
                AuthError::InvalidEmail(_)
                | AuthError::InvalidPhone(_)
                | AuthError::InvalidName(_)
                | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::Token(_) | AuthError::PasswordHash | AuthError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Cart(err) => match err {
                CartError::InvalidQuantity => StatusCode::BAD_REQUEST,
                CartError::ProductNotFound | CartError::LineNotFound | CartError::Empty => {
                    StatusCode::NOT_FOUND
                }
                CartError::QuantityLimit => StatusCode::CONFLICT,
                CartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Catalog(err) => match err {
                CatalogError::InvalidName(_) | CatalogError::InvalidPrice(_) => {
                    StatusCode::BAD_REQUEST
                }
                CatalogError::ProductNotFound | CatalogError::CategoryNotFound => {
                    StatusCode::NOT_FOUND
                }
                CatalogError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message. Never includes internal details.
    fn detail(&self) -> String {
        match self {
            Self::Database(err)
            | Self::Auth(AuthError::Repository(err))
            | Self::Cart(CartError::Repository(err))
            | Self::Catalog(CatalogError::Repository(err)) => {
                repository_message(err).to_string()
            }
            Self::Auth(AuthError::Token(_) | AuthError::PasswordHash) => {
                "Internal server error".to_string()
            }
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::Unauthenticated => "Could not validate credentials".to_string(),
                AuthError::Forbidden => "Admin privileges required".to_string(),
                AuthError::UserAlreadyExists(what) => format!("User already exists: {what}"),
                AuthError::InvalidEmail(e) => format!("Invalid email address: {e}"),
                AuthError::InvalidPhone(e) => format!("Invalid phone number: {e}"),
                AuthError::InvalidName(msg) | AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::Token(_) | AuthError::PasswordHash | AuthError::Repository(_) => {
                    "Internal server error".to_string()
                }
            },
            Self::Cart(err) => match err {
                CartError::InvalidQuantity => err.to_string(),
                CartError::ProductNotFound => "Product not found".to_string(),
                CartError::LineNotFound => "Product not found in cart".to_string(),
                CartError::Empty => "Cart is empty".to_string(),
                CartError::QuantityLimit => "Cart quantity limit reached".to_string(),
                CartError::Repository(_) => "Internal server error".to_string(),
            },
            Self::Catalog(err) => match err {
                CatalogError::InvalidName(msg) => msg.clone(),
                CatalogError::InvalidPrice(e) => format!("Invalid price: {e}"),
                CatalogError::ProductNotFound => "Product not found".to_string(),
                CatalogError::CategoryNotFound => "Category not found".to_string(),
                CatalogError::Repository(_) => "Internal server error".to_string(),
            },
            Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called after a bearer token resolves so errors are associated with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Cart(CartError::QuantityLimit);
        assert_eq!(err.to_string(), "Cart error: cart quantity limit reached");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        let cases = [
            (AppError::Auth(AuthError::Unauthenticated), StatusCode::UNAUTHORIZED),
            (AppError::Auth(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED),
            (AppError::Auth(AuthError::Forbidden), StatusCode::FORBIDDEN),
            (
                AppError::Auth(AuthError::UserAlreadyExists("email".to_string())),
                StatusCode::CONFLICT,
            ),
            (AppError::Cart(CartError::Empty), StatusCode::NOT_FOUND),
            (AppError::Cart(CartError::InvalidQuantity), StatusCode::BAD_REQUEST),
            (AppError::Cart(CartError::QuantityLimit), StatusCode::CONFLICT),
            (
                AppError::Catalog(CatalogError::CategoryNotFound),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Database(RepositoryError::Timeout),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::Cart(CartError::Repository(RepositoryError::Timeout)),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::Database(RepositoryError::DataCorruption("x".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err}");
        }
    }

    #[tokio::test]
    async fn test_body_is_json_detail() {
        let (status, body) = body_of(AppError::Cart(CartError::Empty)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "detail": "Cart is empty" }));
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, body) = body_of(AppError::Database(RepositoryError::DataCorruption(
            "invalid quantity -3".to_string(),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");
    }
}
