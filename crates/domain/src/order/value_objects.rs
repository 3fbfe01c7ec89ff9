//! Value objects for the order domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pricing::{LinePricing, Money, PricingError, TaxRate};

use super::OrderError;

/// Most media references a single return request may carry.
pub const MAX_RETURN_MEDIA: usize = 5;

/// Unique identifier for a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(Uuid);

impl CustomerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CustomerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<Uuid> for CustomerId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Product identifier (SKU).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Whether the buyer is a person or a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CustomerKind {
    Individual,
    Business {
        company_name: String,
        tax_code: String,
    },
}

/// Customer details copied onto the order at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(flatten)]
    pub kind: CustomerKind,
}

impl CustomerSnapshot {
    pub fn individual(
        customer_id: CustomerId,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            customer_id,
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            address: address.into(),
            kind: CustomerKind::Individual,
        }
    }

    pub fn into_business(
        mut self,
        company_name: impl Into<String>,
        tax_code: impl Into<String>,
    ) -> Self {
        self.kind = CustomerKind::Business {
            company_name: company_name.into(),
            tax_code: tax_code.into(),
        };
        self
    }

    pub fn validate(&self) -> Result<(), OrderError> {
        let mut required = vec![
            ("name", self.name.as_str()),
            ("email", self.email.as_str()),
            ("phone", self.phone.as_str()),
            ("address", self.address.as_str()),
        ];
        if let CustomerKind::Business {
            company_name,
            tax_code,
        } = &self.kind
        {
            required.push(("company name", company_name.as_str()));
            required.push(("tax code", tax_code.as_str()));
        }

        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(OrderError::InvalidCustomer(format!("{field} is required"))),
            None => Ok(()),
        }
    }
}

/// A product line as it was sold. Never changes after checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Price per unit, excluding VAT.
    pub unit_price: Money,
    pub tax_rate: TaxRate,
    pub quantity: u32,
}

impl OrderLineItem {
    pub fn pricing(&self) -> LinePricing {
        LinePricing::new(self.unit_price, self.tax_rate, self.quantity)
    }

    pub fn subtotal(&self) -> Result<Money, PricingError> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// One cart entry as submitted by the customer. Prices are never taken from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl CartLine {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            size: None,
            color: None,
        }
    }

    pub fn with_variant(mut self, size: impl Into<String>, color: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self.color = Some(color.into());
        self
    }
}

/// Opaque reference to an uploaded photo or video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(String);

impl MediaRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A customer's request to send a completed order back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub reason: String,
    pub media: Vec<MediaRef>,
    pub requested_at: DateTime<Utc>,
}
