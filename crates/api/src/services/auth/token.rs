//! Signed bearer tokens.
//!
//! Tokens are HS256 JWTs carrying only the user ID (`sub`, as decimal text)
//! and an expiry (`exp`, unix seconds). Nothing about them is persisted.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shopfloor_core::UserId;

/// JWT payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

/// Errors from issuing or verifying a token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Past its `exp`.
    #[error("token expired")]
    Expired,

    /// Bad signature, wrong algorithm, or not a JWT at all.
    #[error("invalid token: {0}")]
    Invalid(String),

    /// Signature checked out but `sub` is not a user ID.
    #[error("invalid token subject")]
    InvalidSubject,

    /// Encoding failed.
    #[error("token signing failed: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

/// Mints and verifies access tokens with one shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Build an issuer for `secret` whose tokens live for `ttl`.
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let key = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
            ttl,
        }
    }

    /// How long issued tokens stay valid.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `user_id`, expiring `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, user_id: UserId) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (Utc::now() + self.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)
    }

    /// Check signature and expiry, and return the subject.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired`, `TokenError::Invalid` or
    /// `TokenError::InvalidSubject`.
    pub fn verify(&self, token: &str) -> Result<UserId, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })?;

        data.claims
            .sub
            .parse()
            .map_err(|_| TokenError::InvalidSubject)
    }
}
