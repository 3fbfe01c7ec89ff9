//! Demo catalog and stock for local runs and tests.

use domain::{InMemoryCatalog, Money, ProductId, TaxRate};
use event_store::Inventory;

use crate::error::ApiError;

/// Stock given to each demo product that has no stock record yet.
pub const DEMO_STOCK: u32 = 50;

const CATEGORIES: [(&str, u32); 3] = [("dresses", 10), ("tops", 10), ("accessories", 8)];

const PRODUCTS: [(&str, &str, &str, i64); 4] = [
    ("DRESS-01", "Linen wrap dress", "dresses", 200_000),
    ("TEE-01", "Organic cotton tee", "tops", 150_000),
    ("SHIRT-02", "Oxford shirt", "tops", 320_000),
    ("BAG-01", "Canvas tote", "accessories", 120_000),
];

/// Fills the catalog with demo products and gives each one stock.
///
/// Existing stock records are left alone, so restarting against a
/// persistent store does not reset inventory.
pub async fn seed_demo_catalog<I: Inventory>(
    catalog: &InMemoryCatalog,
    inventory: &I,
) -> Result<Vec<ProductId>, ApiError> {
    for (name, percent) in CATEGORIES {
        let rate = TaxRate::from_percent(percent)
            .map_err(|e| ApiError::Internal(format!("demo category {name}: {e}")))?;
        catalog.upsert_category(name, rate).await;
    }

    let mut seeded = Vec::with_capacity(PRODUCTS.len());
    for (id, name, category, price) in PRODUCTS {
        catalog
            .upsert_product(id, name, category, Money::new(price))
            .await;
        let existing = inventory
            .stock_level(id)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        if existing.is_none() {
            inventory
                .set_stock(id, DEMO_STOCK)
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))?;
        }
        seeded.push(ProductId::new(id));
    }

    tracing::info!(products = seeded.len(), "demo catalog seeded");
    Ok(seeded)
}
