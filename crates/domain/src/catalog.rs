//! Product catalog read at checkout.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::DomainError;
use crate::order::ProductId;
use crate::pricing::{Money, TaxRate};

/// Current sale data for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub product_id: ProductId,
    pub name: String,
    /// Price per unit, excluding VAT.
    pub unit_price: Money,
    /// VAT rate of the product's category.
    pub tax_rate: TaxRate,
}

/// Source of authoritative prices and tax rates.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Returns `None` for unknown products.
    async fn product(&self, product_id: &ProductId) -> Result<Option<CatalogProduct>, DomainError>;
}

#[derive(Debug, Clone)]
struct ProductEntry {
    name: String,
    category: String,
    unit_price: Money,
}

#[derive(Debug, Default)]
struct CatalogState {
    categories: HashMap<String, TaxRate>,
    products: HashMap<ProductId, ProductEntry>,
}

/// In-memory catalog. Tax rates belong to categories and are looked up on
/// every read, so changing a category rate affects future checkouts only.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_category(&self, name: impl Into<String>, tax_rate: TaxRate) {
        self.state
            .write()
            .await
            .categories
            .insert(name.into(), tax_rate);
    }

    pub async fn upsert_product(
        &self,
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        category: impl Into<String>,
        unit_price: Money,
    ) {
        self.state.write().await.products.insert(
            product_id.into(),
            ProductEntry {
                name: name.into(),
                category: category.into(),
                unit_price,
            },
        );
    }

    /// Changes the current price. Returns `false` for unknown products.
    pub async fn set_price(&self, product_id: &ProductId, unit_price: Money) -> bool {
        match self.state.write().await.products.get_mut(product_id) {
            Some(entry) => {
                entry.unit_price = unit_price;
                true
            }
            None => false,
        }
    }

    pub async fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<_> = self.state.read().await.products.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn product(&self, product_id: &ProductId) -> Result<Option<CatalogProduct>, DomainError> {
        let state = self.state.read().await;
        let Some(entry) = state.products.get(product_id) else {
            return Ok(None);
        };
        // A product whose category has no rate cannot be sold.
        let Some(tax_rate) = state.categories.get(&entry.category).copied() else {
            tracing::warn!(%product_id, category = %entry.category, "product category has no tax rate");
            return Ok(None);
        };

        Ok(Some(CatalogProduct {
            product_id: product_id.clone(),
            name: entry.name.clone(),
            unit_price: entry.unit_price,
            tax_rate,
        }))
    }
}
