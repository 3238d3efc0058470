//! Authentication error types.

use thiserror::Error;

use shopfloor_core::{EmailError, PhoneError};

use super::TokenError;
use crate::db::RepositoryError;

/// Errors that can occur during registration, login and access checks.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Invalid phone format.
    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] PhoneError),

    /// Name empty or too long.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Unknown identifier or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Email or phone already registered.
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),

    /// Missing, malformed or expired token, or its user is gone.
    #[error("not authenticated")]
    Unauthenticated,

    /// Valid token, but not an administrator.
    #[error("admin access required")]
    Forbidden,

    /// Token signing failed.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
