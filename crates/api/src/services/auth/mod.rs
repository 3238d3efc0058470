//! Authentication service.
//!
//! Registration and password login, plus the token and access-gate pieces
//! the HTTP extractors build on.

mod error;
mod gate;
mod token;

pub use error::AuthError;
pub use gate::AccessGate;
pub use token::{Claims, TokenError, TokenIssuer};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use shopfloor_core::{Email, Phone};

use crate::db::{RepositoryError, Store};
use crate::models::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length (bounds hashing work per request).
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum display name length.
const MAX_NAME_LENGTH: usize = 100;

/// Registration form as received.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'r> {
    pub name: &'r str,
    pub email: &'r str,
    pub phone: &'r str,
    pub password: &'r str,
}

/// Authentication service.
///
/// Handles user registration and login.
pub struct AuthService<'a> {
    store: &'a dyn Store,
    tokens: &'a TokenIssuer,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, tokens: &'a TokenIssuer) -> Self {
        Self { store, tokens }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidName`, `AuthError::InvalidEmail`,
    /// `AuthError::InvalidPhone` or `AuthError::WeakPassword` for bad input.
    /// Returns `AuthError::UserAlreadyExists` if the email or phone is taken.
    pub async fn register(&self, form: Registration<'_>) -> Result<User, AuthError> {
        let name = validate_name(form.name)?;
        let email = Email::parse(form.email)?;
        let phone = Phone::parse(form.phone)?;
        validate_password(form.password)?;

        let password = form.password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|_| AuthError::PasswordHash)??;

        let user = self
            .store
            .create_user(&NewUser {
                name,
                email,
                phone,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(msg) => AuthError::UserAlreadyExists(msg),
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Log in with an email or phone number and a password.
    ///
    /// Returns the user and a freshly signed access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the identifier is unknown
    /// or malformed, or the password is wrong.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<(User, String), AuthError> {
        let found = if identifier.contains('@') {
            match Email::parse(identifier) {
                Ok(email) => self.store.credentials_by_email(&email).await?,
                Err(_) => None,
            }
        } else {
            match Phone::parse(identifier) {
                Ok(phone) => self.store.credentials_by_phone(&phone).await?,
                Err(_) => None,
            }
        };

        let (user, password_hash) = found.ok_or(AuthError::InvalidCredentials)?;

        let password = password.to_owned();
        tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
            .await
            .map_err(|_| AuthError::PasswordHash)??;

        let token = self.tokens.issue(user.id)?;
        tracing::info!(user_id = %user.id, "user logged in");
        Ok((user, token))
    }
}

/// Trim and bound the display name.
fn validate_name(name: &str) -> Result<String, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::InvalidName("name must not be empty".to_owned()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AuthError::InvalidName(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_owned())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} bytes"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use secrecy::SecretString;

    use super::*;
    use crate::db::MemoryStore;

    fn tokens() -> TokenIssuer {
        TokenIssuer::new(
            &SecretString::from("k3J9x!vQ2mZp8LwR4tYb7NcF0hDs6GaE".to_owned()),
            Duration::minutes(30),
        )
    }

    fn alice() -> Registration<'static> {
        Registration {
            name: "Alice",
            email: "a@x.com",
            phone: "555-0001",
            password: "correct horse",
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Alice ").unwrap(), "Alice");
        assert!(matches!(validate_name("   "), Err(AuthError::InvalidName(_))));
    }

    #[tokio::test]
    async fn test_register_then_login_by_email_and_phone() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);

        let user = auth.register(alice()).await.unwrap();

        let (by_email, token) = auth.login("a@x.com", "correct horse").await.unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(tokens.verify(&token).unwrap(), user.id);

        let (by_phone, _) = auth.login("555-0001", "correct horse").await.unwrap();
        assert_eq!(by_phone.id, user.id);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);
        auth.register(alice()).await.unwrap();

        for (identifier, password) in [
            ("a@x.com", "wrong password"),
            ("b@x.com", "correct horse"),
            ("555-9999", "correct horse"),
            ("not an identifier", "correct horse"),
        ] {
            assert!(matches!(
                auth.login(identifier, password).await,
                Err(AuthError::InvalidCredentials)
            ));
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);
        auth.register(alice()).await.unwrap();

        let again = auth
            .register(Registration {
                phone: "555-0002",
                ..alice()
            })
            .await;
        assert!(matches!(again, Err(AuthError::UserAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);

        let bad_email = auth
            .register(Registration {
                email: "nope",
                ..alice()
            })
            .await;
        assert!(matches!(bad_email, Err(AuthError::InvalidEmail(_))));

        let bad_phone = auth
            .register(Registration {
                phone: "call me",
                ..alice()
            })
            .await;
        assert!(matches!(bad_phone, Err(AuthError::InvalidPhone(_))));
    }
}
