//! Voucher catalog and resolution.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Money, PricingError};

/// What a voucher does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoucherKind {
    /// A fraction of the pre-tax subtotal, e.g. `0.10`.
    Percentage { rate: Decimal },

    /// Shipping is already free, so the discount is always zero.
    FreeShipping,
}

/// A voucher resolved against a subtotal. The discount is frozen here and
/// stored on the order as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherApplication {
    pub code: String,
    pub kind: VoucherKind,
    pub discount: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherRejection {
    NotFound,
}

impl std::fmt::Display for VoucherRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoucherRejection::NotFound => write!(f, "not found"),
        }
    }
}

/// Outcome of [`VoucherCatalog::resolve`]. An unknown code is a value, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VoucherResolution {
    Valid(VoucherApplication),
    Invalid {
        code: String,
        reason: VoucherRejection,
    },
}

impl VoucherResolution {
    pub fn is_valid(&self) -> bool {
        matches!(self, VoucherResolution::Valid(_))
    }
}

/// Static set of voucher codes, keyed by upper-case code.
#[derive(Debug, Clone, Default)]
pub struct VoucherCatalog {
    vouchers: HashMap<String, VoucherKind>,
}

impl VoucherCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The store's standing vouchers: `SALE10` (10% off) and `FREESHIP`.
    pub fn standard() -> Self {
        Self::empty()
            .with_voucher(
                "SALE10",
                VoucherKind::Percentage {
                    rate: Decimal::new(10, 2),
                },
            )
            .with_voucher("FREESHIP", VoucherKind::FreeShipping)
    }

    pub fn with_voucher(mut self, code: &str, kind: VoucherKind) -> Self {
        self.vouchers.insert(normalize(code), kind);
        self
    }

    /// Resolves `code` against a pre-tax subtotal.
    ///
    /// Matching ignores case and surrounding whitespace.
    pub fn resolve(&self, code: &str, subtotal: Money) -> Result<VoucherResolution, PricingError> {
        let canonical = normalize(code);
        let Some(kind) = self.vouchers.get(&canonical).copied() else {
            return Ok(VoucherResolution::Invalid {
                code: code.trim().to_string(),
                reason: VoucherRejection::NotFound,
            });
        };

        let discount = match kind {
            VoucherKind::Percentage { rate } => {
                let exact = subtotal
                    .to_decimal()
                    .checked_mul(rate)
                    .ok_or(PricingError::AmountOverflow)?;
                Money::round_half_up(exact)?.min(subtotal)
            }
            VoucherKind::FreeShipping => Money::ZERO,
        };

        Ok(VoucherResolution::Valid(VoucherApplication {
            code: canonical,
            kind,
            discount,
        }))
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}
