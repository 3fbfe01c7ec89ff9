//! Pricing: money, VAT calculation and vouchers.

mod calculator;
mod money;
mod voucher;

pub use calculator::{LineAmounts, LinePricing, OrderSummary, price_line, subtotal, summarize};
pub use money::{Money, TaxRate};
pub use voucher::{
    VoucherApplication, VoucherCatalog, VoucherKind, VoucherRejection, VoucherResolution,
};

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while pricing line items.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("Invalid line item: unit price {0} is negative")]
    NegativePrice(Money),

    #[error("Invalid line item: tax rate {0} is outside [0, 1]")]
    TaxRateOutOfRange(Decimal),

    #[error("Invalid line item: quantity must be at least 1")]
    ZeroQuantity,

    #[error("Invalid line item: an order needs at least one line")]
    NoLines,

    #[error("Invalid line item: discount {discount} exceeds subtotal {subtotal}")]
    DiscountExceedsSubtotal { discount: Money, subtotal: Money },

    #[error("Invalid line item: amount overflows")]
    AmountOverflow,
}
