//! Stock levels and atomic stock adjustments.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Which way a [`StockChange`] moves the available quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockDirection {
    /// Take units out of stock; refused if fewer than `quantity` are available.
    Decrement,
    /// Put units back into stock.
    Increment,
}

/// A stock adjustment that commits together with an event append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    pub product_id: String,
    pub quantity: u32,
    pub direction: StockDirection,
}

impl StockChange {
    pub fn decrement(product_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            direction: StockDirection::Decrement,
        }
    }

    pub fn increment(product_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            direction: StockDirection::Increment,
        }
    }

    /// Applies this change to `available`, returning the new level.
    ///
    /// Returns `None` when a decrement would go below zero.
    pub fn apply_to(&self, available: u32) -> Option<u32> {
        match self.direction {
            StockDirection::Decrement => available.checked_sub(self.quantity),
            StockDirection::Increment => available.checked_add(self.quantity),
        }
    }
}

/// Inventory collaborator.
///
/// Every mutation is a conditional update on a single product: implementations
/// never read a level and write it back in two steps.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Returns the available quantity, or `None` if the product has no stock record.
    async fn stock_level(&self, product_id: &str) -> Result<Option<u32>>;

    /// Creates or overwrites the stock record for a product.
    async fn set_stock(&self, product_id: &str, available: u32) -> Result<()>;

    /// Takes `quantity` units if at least that many are available.
    ///
    /// Fails with `InsufficientStock` (leaving the level untouched) otherwise.
    async fn decrement_if_available(&self, product_id: &str, quantity: u32) -> Result<u32>;

    /// Returns `quantity` units to stock.
    async fn increment(&self, product_id: &str, quantity: u32) -> Result<u32>;
}
