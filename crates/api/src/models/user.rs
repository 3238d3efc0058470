//! User domain types.

use chrono::{DateTime, Utc};

use shopfloor_core::{Email, Phone, UserId};

/// A registered shopper.
///
/// The password hash is deliberately not part of this type; it only ever
/// travels alongside a `User` on the login path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address (unique, login identifier).
    pub email: Email,
    /// Phone number (unique, login identifier).
    pub phone: Phone,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Data needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub phone: Phone,
    /// Argon2id PHC string.
    pub password_hash: String,
}
