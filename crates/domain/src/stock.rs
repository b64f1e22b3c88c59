//! Stock validation against a snapshot read of an item.

use thiserror::Error;

use crate::item::Item;

/// Business-rule rejections for a requested quantity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    /// The requested quantity is zero, negative or not a number.
    #[error("Quantity must be at least 1")]
    InvalidQuantity { requested: i64 },

    /// No units are left at all.
    #[error("'{item_name}' is out of stock")]
    OutOfStock { item_name: String },

    /// Some units are left, but fewer than requested.
    #[error("Only {available} '{item_name}' left in stock")]
    InsufficientStock { item_name: String, available: u32 },
}

/// Parses a requested quantity from user input.
///
/// Non-numeric input and values below one map to
/// [`StockError::InvalidQuantity`] before the workflow is ever reached.
pub fn parse_quantity(input: &str) -> Result<i64, StockError> {
    match input.trim().parse::<i64>() {
        Ok(quantity) if quantity > 0 => Ok(quantity),
        Ok(quantity) => Err(StockError::InvalidQuantity {
            requested: quantity,
        }),
        Err(_) => Err(StockError::InvalidQuantity { requested: 0 }),
    }
}

/// Checks a requested quantity against an item snapshot.
///
/// The result is advisory: the snapshot may be stale by the time stock is
/// adjusted, which is why the adjustment itself is conditional.
pub struct StockValidator;

impl StockValidator {
    /// Validates `requested` against `item` and returns the accepted quantity.
    pub fn validate(item: &Item, requested: i64) -> Result<u32, StockError> {
        if requested <= 0 {
            return Err(StockError::InvalidQuantity { requested });
        }
        if item.quantity_on_hand == 0 {
            return Err(StockError::OutOfStock {
                item_name: item.name.clone(),
            });
        }
        if requested > i64::from(item.quantity_on_hand) {
            return Err(StockError::InsufficientStock {
                item_name: item.name.clone(),
                available: item.quantity_on_hand,
            });
        }
        // requested <= quantity_on_hand, which is a u32
        Ok(requested as u32)
    }
}
