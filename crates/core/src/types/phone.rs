//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone cannot be empty")]
    Empty,
    /// The input contains characters other than digits and separators.
    #[error("phone may only contain digits, spaces, '+', '-', '.', '(' and ')'")]
    InvalidCharacter,
    /// The number of digits is outside the E.164 range.
    #[error("phone must contain between {min} and {max} digits")]
    DigitCount {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
    },
}

/// A phone number as entered by the user.
///
/// The text is kept verbatim (minus surrounding whitespace) because it doubles
/// as a login identifier: the user logs in with exactly what they registered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    /// Fewest digits accepted (short local numbers like `555-0001`).
    pub const MIN_DIGITS: usize = 4;
    /// Most digits accepted (E.164 limit).
    pub const MAX_DIGITS: usize = 15;

    /// Parse a `Phone` from a string.
    ///
    /// # Errors
    ///
    /// Returns a [`PhoneError`] if the input is empty, contains letters or
    /// other symbols, or has too few or too many digits.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        if !s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '.' | '(' | ')'))
        {
            return Err(PhoneError::InvalidCharacter);
        }

        let digits = s.chars().filter(char::is_ascii_digit).count();
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits) {
            return Err(PhoneError::DigitCount {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the phone number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Phone {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Phone {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Phone {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Phone {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
