//! Inventory items.

use common::ItemId;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Normalizes an item name for storage and comparison.
///
/// Names are unique case-insensitively, so every boundary that stores or
/// compares a name goes through this function.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// An item available for sale, as read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,

    /// Normalized item name.
    pub name: String,

    /// Current catalog price per unit.
    pub unit_price: Money,

    /// Units available for sale.
    pub quantity_on_hand: u32,

    pub description: Option<String>,
}

impl Item {
    /// Returns true if no units are left.
    pub fn is_out_of_stock(&self) -> bool {
        self.quantity_on_hand == 0
    }
}

/// An item to be created in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    name: String,
    pub unit_price: Money,
    pub quantity_on_hand: u32,
    pub description: Option<String>,
}

impl NewItem {
    /// Creates a new item, normalizing its name.
    pub fn new(
        name: &str,
        unit_price: Money,
        quantity_on_hand: u32,
        description: Option<String>,
    ) -> Self {
        Self {
            name: normalize_name(name),
            unit_price,
            quantity_on_hand,
            description: description.filter(|d| !d.trim().is_empty()),
        }
    }

    /// Returns the normalized name.
    pub fn name(&self) -> &str {
        &self.name
    }
}
