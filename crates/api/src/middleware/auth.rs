//! Bearer-token extractors.
//!
//! Handlers name the access they need in their signature:
//!
//! ```rust,ignore
//! async fn profile(CurrentUser(user): CurrentUser) -> Json<ProfileResponse> { ... }
//! async fn create_product(RequireAdmin(admin): RequireAdmin, ...) -> ... { ... }
//! ```
//!
//! Both reject with `AppError`, so failures render as `{"detail": ...}` with
//! 401 (no or bad token) or 403 (not an administrator).

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::Span;

use shopfloor_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::services::AuthError;
use crate::state::AppState;

/// Extractor for the user a valid bearer token belongs to.
pub struct CurrentUser(pub User);

/// Extractor that only admits tokens whose subject is on the admin
/// allow-list.
pub struct RequireAdmin(pub UserId);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let user = state.gate().identify(state.store(), token).await?;
        record_user(user.id);
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let user_id = state.gate().authorize_admin(token)?;
        record_user(user_id);
        Ok(Self(user_id))
    }
}

/// The token from `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively.
fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let value = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::Unauthenticated)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::Unauthenticated)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Unauthenticated);
    }
    Ok(token)
}

fn record_user(user_id: UserId) {
    Span::current().record("user_id", user_id.as_i32());
    set_sentry_user(&user_id);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/profile/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))).unwrap(), "abc.def");
        assert_eq!(bearer_token(&parts_with(Some("bearer  abc"))).unwrap(), "abc");

        for bad in [None, Some("abc"), Some("Basic abc"), Some("Bearer "), Some("Bearer")] {
            assert!(matches!(
                bearer_token(&parts_with(bad)),
                Err(AuthError::Unauthenticated)
            ));
        }
    }
}
