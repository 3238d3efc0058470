//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored as `NUMERIC(12, 2)` and never go through `f64` except
//! when rendered into JSON, where clients expect a plain number.

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Zero or negative amount.
    #[error("price must be greater than zero")]
    NotPositive,
    /// More than two decimal places.
    #[error("price must have at most {max_scale} decimal places")]
    TooPrecise {
        /// Maximum number of decimal places.
        max_scale: u32,
    },
    /// Larger than the column can hold.
    #[error("price must be less than {max}")]
    TooLarge {
        /// Exclusive upper bound.
        max: Decimal,
    },
}

/// A strictly positive amount in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(Decimal);

impl Price {
    /// Maximum number of decimal places.
    pub const MAX_SCALE: u32 = 2;

    /// Exclusive upper bound imposed by `NUMERIC(12, 2)`.
    pub const MAX: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

    /// Create a validated price.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] if the amount is not positive, has more than
    /// two decimal places, or does not fit the database column.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        let amount = amount.normalize();
        if amount.scale() > Self::MAX_SCALE {
            return Err(PriceError::TooPrecise {
                max_scale: Self::MAX_SCALE,
            });
        }
        if amount >= Self::MAX {
            return Err(PriceError::TooLarge { max: Self::MAX });
        }
        Ok(Self(amount))
    }

    /// Price from an amount in cents.
    ///
    /// # Errors
    ///
    /// Same as [`Price::new`].
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        Self::new(Decimal::new(cents, 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Line total for `quantity` units at this price.
    ///
    /// Saturates instead of overflowing; cart quantities are `i32`, so the
    /// product always fits a `Decimal` in practice.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Decimal {
        self.0
            .checked_mul(Decimal::from(quantity))
            .unwrap_or(Decimal::MAX)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0.to_f64().unwrap_or_default())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

/// Serialize a bare `Decimal` amount (e.g. a line total) as a JSON number.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize_amount<S: Serializer>(
    amount: &Decimal,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(amount.to_f64().unwrap_or_default())
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_rejects_non_positive() {
        assert_eq!(Price::new(Decimal::ZERO), Err(PriceError::NotPositive));
        assert_eq!(Price::new(dec("-1.50")), Err(PriceError::NotPositive));
    }

    #[test]
    fn test_rejects_sub_cent() {
        assert!(matches!(
            Price::new(dec("1.005")),
            Err(PriceError::TooPrecise { .. })
        ));
        // Trailing zeros are not extra precision
        assert!(Price::new(dec("1.5000")).is_ok());
    }

    #[test]
    fn test_rejects_too_large() {
        assert!(matches!(
            Price::new(dec("10000000000")),
            Err(PriceError::TooLarge { .. })
        ));
        assert!(Price::new(dec("9999999999.99")).is_ok());
    }

    #[test]
    fn test_times() {
        let price = Price::from_cents(1999).unwrap();
        assert_eq!(price.times(5), dec("99.95"));
        assert_eq!(price.times(1), dec("19.99"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::new(dec("4.5")).unwrap().to_string(), "4.50");
    }

    #[test]
    fn test_json_is_numeric() {
        let price = Price::new(dec("9.99")).unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "9.99");

        let parsed: Price = serde_json::from_str("9.99").unwrap();
        assert_eq!(parsed, price);
        let parsed: Price = serde_json::from_str("\"9.99\"").unwrap();
        assert_eq!(parsed, price);
        assert!(serde_json::from_str::<Price>("0").is_err());
    }
}
