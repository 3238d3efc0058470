//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPFLOOR_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`); the literal `memory` selects the in-process store
//! - `SHOPFLOOR_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `SHOPFLOOR_HOST` - Bind address (default: 127.0.0.1)
//! - `SHOPFLOOR_PORT` - Listen port (default: 8000)
//! - `SHOPFLOOR_TOKEN_TTL_MINUTES` - Access token lifetime (default: 30)
//! - `SHOPFLOOR_ADMIN_IDS` - Comma-separated user IDs allowed to manage the catalog
//! - `SHOPFLOOR_DB_TIMEOUT_SECS` - Per-call store deadline (default: 5)
//! - `SHOPFLOOR_RATE_LIMIT` - `true`/`false` (default: true)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use shopfloor_core::UserId;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// `SHOPFLOOR_DATABASE_URL` value selecting the in-process store.
pub const MEMORY_DATABASE_URL: &str = "memory";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Token and admin settings
    pub auth: AuthConfig,
    /// Deadline for each store call
    pub db_timeout: Duration,
    /// Whether per-IP rate limiting is applied
    pub rate_limit: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Token signing and admin allow-list.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: SecretString,
    /// Lifetime of issued access tokens
    pub token_ttl: chrono::Duration,
    /// Users allowed to create categories and products
    pub admin_ids: Vec<UserId>,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_vars(&|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ApiConfig::from_env`].
    pub fn from_vars(vars: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(vars);

        let database_url = env.database_url("SHOPFLOOR_DATABASE_URL")?;
        let host = env.parsed_or("SHOPFLOOR_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?;
        let port: u16 = env.parsed_or("SHOPFLOOR_PORT", 8000)?;
        let db_timeout_secs: u64 = env.parsed_or("SHOPFLOOR_DB_TIMEOUT_SECS", 5)?;
        if db_timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPFLOOR_DB_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let rate_limit = env.parsed_or("SHOPFLOOR_RATE_LIMIT", true)?;

        Ok(Self {
            database_url,
            host,
            port,
            auth: AuthConfig::from_env(&env)?,
            db_timeout: Duration::from_secs(db_timeout_secs),
            rate_limit,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the in-process store was requested instead of `PostgreSQL`.
    #[must_use]
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.expose_secret() == MEMORY_DATABASE_URL
    }
}

impl AuthConfig {
    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        let jwt_secret = env.validated_secret("SHOPFLOOR_JWT_SECRET")?;
        validate_jwt_secret(&jwt_secret, "SHOPFLOOR_JWT_SECRET")?;

        let ttl_minutes: u32 = env.parsed_or("SHOPFLOOR_TOKEN_TTL_MINUTES", 30)?;
        if ttl_minutes == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPFLOOR_TOKEN_TTL_MINUTES".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let admin_ids = env
            .optional("SHOPFLOOR_ADMIN_IDS")
            .map(|raw| parse_admin_ids(&raw))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            jwt_secret,
            token_ttl: chrono::Duration::minutes(i64::from(ttl_minutes)),
            admin_ids,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup shared by the loaders.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable; blank counts as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Parse a variable, or use `default` when unset.
    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
            None => Ok(default),
        }
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

/// Parse a comma-separated list of user IDs. Empty entries are skipped.
fn parse_admin_ids(raw: &str) -> Result<Vec<UserId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<UserId>().map_err(|e| {
                ConfigError::InvalidEnvVar("SHOPFLOOR_ADMIN_IDS".to_string(), format!("{s:?}: {e}"))
            })
        })
        .collect()
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const JWT_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

    fn load(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ApiConfig::from_vars(&|key| vars.get(key).cloned())
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("SHOPFLOOR_DATABASE_URL", "postgres://localhost/shopfloor"),
            ("SHOPFLOOR_JWT_SECRET", JWT_SECRET),
        ]
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(matches!(
            validate_secret_strength("your-api-key-here", "TEST_VAR"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_secret_strength("changeme123", "TEST_VAR").is_err());
        assert!(matches!(
            validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_secret_strength(JWT_SECRET, "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_jwt_secret_length() {
        assert!(validate_jwt_secret(&SecretString::from("short"), "TEST").is_err());
        assert!(validate_jwt_secret(&SecretString::from("a".repeat(32)), "TEST").is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = load(&minimal()).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8000");
        assert_eq!(config.auth.token_ttl, chrono::Duration::minutes(30));
        assert!(config.auth.admin_ids.is_empty());
        assert_eq!(config.db_timeout, Duration::from_secs(5));
        assert!(config.rate_limit);
        assert!(!config.uses_memory_store());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let mut vars = minimal();
        vars.extend([
            ("SHOPFLOOR_PORT", "9000"),
            ("SHOPFLOOR_TOKEN_TTL_MINUTES", "5"),
            ("SHOPFLOOR_ADMIN_IDS", "1, 7,,42"),
            ("SHOPFLOOR_RATE_LIMIT", "false"),
        ]);
        let config = load(&vars).unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.auth.token_ttl, chrono::Duration::minutes(5));
        assert_eq!(
            config.auth.admin_ids,
            vec![UserId::new(1), UserId::new(7), UserId::new(42)]
        );
        assert!(!config.rate_limit);
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[
            ("DATABASE_URL", MEMORY_DATABASE_URL),
            ("SHOPFLOOR_JWT_SECRET", JWT_SECRET),
        ])
        .unwrap();
        assert!(config.uses_memory_store());

        let missing = load(&[("SHOPFLOOR_JWT_SECRET", JWT_SECRET)]);
        assert!(matches!(
            missing,
            Err(ConfigError::MissingEnvVar(k)) if k == "SHOPFLOOR_DATABASE_URL"
        ));
    }

    #[test]
    fn test_invalid_values() {
        let mut bad_admin = minimal();
        bad_admin.push(("SHOPFLOOR_ADMIN_IDS", "1,alice"));
        assert!(matches!(load(&bad_admin), Err(ConfigError::InvalidEnvVar(_, _))));

        let mut bad_port = minimal();
        bad_port.push(("SHOPFLOOR_PORT", "eighty"));
        assert!(matches!(load(&bad_port), Err(ConfigError::InvalidEnvVar(_, _))));

        let mut zero_ttl = minimal();
        zero_ttl.push(("SHOPFLOOR_TOKEN_TTL_MINUTES", "0"));
        assert!(load(&zero_ttl).is_err());
    }

    #[test]
    fn test_weak_jwt_secret_rejected() {
        let result = load(&[
            ("SHOPFLOOR_DATABASE_URL", "postgres://localhost/shopfloor"),
            ("SHOPFLOOR_JWT_SECRET", "my-jwt-secret-changeme-please-now"),
        ]);
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&minimal()).unwrap();
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains(JWT_SECRET));
        assert!(!debug_output.contains("postgres://localhost/shopfloor"));
    }
}
