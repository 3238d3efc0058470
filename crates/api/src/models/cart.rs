//! Cart domain types.
//!
//! A cart is not an entity of its own: it is the set of [`CartLine`]s that
//! share a user ID. Each `(user, product)` pair is either absent or present
//! with a quantity of at least one.

use rust_decimal::Decimal;

use shopfloor_core::{Price, ProductId, UserId};

/// One `(user, product)` quantity record as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub user_id: UserId,
    pub product_id: ProductId,
    /// Always at least 1.
    pub quantity: u32,
    /// Unit price captured when the line was first created. Later catalog
    /// price changes do not touch it.
    pub price: Price,
}

impl CartLine {
    /// `quantity × price`.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.price.times(self.quantity)
    }
}

/// A cart line joined with the live product name and image for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub line: CartLine,
    pub name: String,
    pub image_url: Option<String>,
}

/// Result of taking one unit off a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decremented {
    /// The line is still present with the new quantity.
    Updated(CartLine),
    /// The quantity was 1, so the line was deleted.
    Removed,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_total_uses_snapshot_price() {
        let line = CartLine {
            user_id: UserId::new(1),
            product_id: ProductId::new(7),
            quantity: 5,
            price: Price::from_cents(250).unwrap(),
        };
        assert_eq!(line.total(), Decimal::new(1250, 2));
    }
}
