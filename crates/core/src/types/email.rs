//! Email address type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input string is empty.
    #[error("email cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains whitespace.
    #[error("email cannot contain whitespace")]
    Whitespace,
    /// The input does not contain exactly one @ symbol.
    #[error("email must contain exactly one @ symbol")]
    InvalidAtSymbol,
    /// The local part (before @) is empty.
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    /// The domain part (after @) is empty or has no dot.
    #[error("email domain must be a dotted host name")]
    InvalidDomain,
}

/// A validated email address.
///
/// Surrounding whitespace is trimmed and the domain is lowercased, so two
/// spellings of the same address compare equal and hit the same unique index.
///
/// ## Constraints
///
/// - Length: 1-254 characters (RFC 5321 limit)
/// - Exactly one @ symbol, no inner whitespace
/// - Non-empty local part
/// - Domain containing at least one dot, not at either end
///
/// ## Examples
///
/// ```
/// use shopfloor_core::Email;
///
/// assert!(Email::parse("a@x.com").is_ok());
/// assert_eq!(Email::parse(" Alice@Example.COM ").unwrap().as_str(), "Alice@example.com");
///
/// assert!(Email::parse("").is_err());
/// assert!(Email::parse("no-at-symbol").is_err());
/// assert!(Email::parse("user@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email` from a string.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first constraint the input
    /// violates.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();

        if s.is_empty() {
            return Err(EmailError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let mut parts = s.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(EmailError::InvalidAtSymbol);
        };

        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }

        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(EmailError::InvalidDomain);
        }

        Ok(Self(format!("{local}@{}", domain.to_ascii_lowercase())))
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain part of the email (after the @).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split('@').nth(1).unwrap_or("")
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Email {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Email {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Rows were validated on insert
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Email {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_emails() {
        assert!(Email::parse("a@x.com").is_ok());
        assert!(Email::parse("user.name+tag@example.co.uk").is_ok());
        assert!(Email::parse("a@b.c").is_ok());
    }

    #[test]
    fn test_parse_normalizes() {
        let email = Email::parse("  Bob@Shop.EXAMPLE.com\n").unwrap();
        assert_eq!(email.as_str(), "Bob@shop.example.com");
        assert_eq!(email.domain(), "shop.example.com");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            Email::parse(&long),
            Err(EmailError::TooLong { .. })
        ));
    }

    #[test]
    fn test_parse_at_symbol() {
        assert_eq!(Email::parse("nope"), Err(EmailError::InvalidAtSymbol));
        assert_eq!(Email::parse("a@b@c.com"), Err(EmailError::InvalidAtSymbol));
    }

    #[test]
    fn test_parse_whitespace_inside() {
        assert_eq!(Email::parse("a b@x.com"), Err(EmailError::Whitespace));
    }

    #[test]
    fn test_parse_bad_parts() {
        assert_eq!(Email::parse("@x.com"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("a@"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("a@localhost"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("a@x.com."), Err(EmailError::InvalidDomain));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Email = serde_json::from_str("\"a@X.com\"").unwrap();
        assert_eq!(ok.as_str(), "a@x.com");
        assert!(serde_json::from_str::<Email>("\"not-an-email\"").is_err());
    }
}
