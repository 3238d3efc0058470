//! Bearer-token access checks.

use std::collections::HashSet;

use shopfloor_core::UserId;

use super::{AuthError, TokenIssuer};
use crate::db::Store;
use crate::models::User;

/// Resolves bearer tokens to users, or checks them against the admin
/// allow-list.
///
/// The allow-list is fixed at construction; the gate never writes anything.
#[derive(Debug, Clone)]
pub struct AccessGate {
    tokens: TokenIssuer,
    admins: HashSet<UserId>,
}

impl AccessGate {
    /// Create a gate that verifies with `tokens` and treats `admins` as
    /// administrators.
    #[must_use]
    pub fn new(tokens: TokenIssuer, admins: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            tokens,
            admins: admins.into_iter().collect(),
        }
    }

    /// Identity mode: the user the token was issued to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` if the token does not verify or
    /// its user no longer exists, and `AuthError::Repository` if the lookup
    /// fails.
    pub async fn identify(&self, store: &dyn Store, token: &str) -> Result<User, AuthError> {
        let user_id = self.subject(token)?;

        store.user_by_id(user_id).await?.ok_or_else(|| {
            tracing::debug!(%user_id, "token subject does not exist");
            AuthError::Unauthenticated
        })
    }

    /// Admin mode: the token's subject, if it is on the allow-list.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` if the token does not verify and
    /// `AuthError::Forbidden` if the subject is not an administrator.
    pub fn authorize_admin(&self, token: &str) -> Result<UserId, AuthError> {
        let user_id = self.subject(token)?;

        if self.admins.contains(&user_id) {
            Ok(user_id)
        } else {
            tracing::info!(%user_id, "admin access denied");
            Err(AuthError::Forbidden)
        }
    }

    fn subject(&self, token: &str) -> Result<UserId, AuthError> {
        self.tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            AuthError::Unauthenticated
        })
    }
}
