//! VAT calculator.
//!
//! Line subtotals are exact integers. VAT is fractional: the per-line values
//! returned by [`price_line`] are rounded independently for display, while
//! [`summarize`] sums the unrounded VAT of every line and rounds once, half
//! up. Display values are never fed back into the order totals.
//!
//! Vouchers discount the pre-tax subtotal only. VAT is always charged on the
//! undiscounted line subtotals, so a percentage voucher lowers `total` by
//! exactly the discount and leaves `total_vat` unchanged.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Money, PricingError, TaxRate};

/// The inputs needed to price one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePricing {
    pub unit_price: Money,
    pub tax_rate: TaxRate,
    pub quantity: u32,
}

impl LinePricing {
    pub fn new(unit_price: Money, tax_rate: TaxRate, quantity: u32) -> Self {
        Self {
            unit_price,
            tax_rate,
            quantity,
        }
    }

    fn validate(&self) -> Result<(), PricingError> {
        if self.unit_price.is_negative() {
            return Err(PricingError::NegativePrice(self.unit_price));
        }
        if self.quantity == 0 {
            return Err(PricingError::ZeroQuantity);
        }
        Ok(())
    }

    fn line_subtotal(&self) -> Result<Money, PricingError> {
        self.validate()?;
        self.unit_price.checked_mul(self.quantity)
    }

    fn exact_vat(&self) -> Result<Decimal, PricingError> {
        let subtotal = self.line_subtotal()?;
        subtotal
            .to_decimal()
            .checked_mul(self.tax_rate.as_decimal())
            .ok_or(PricingError::AmountOverflow)
    }
}

/// Per-line amounts for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub subtotal: Money,
    pub vat: Money,
    pub total: Money,
}

/// Totals for a whole order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub subtotal: Money,
    pub voucher_discount: Money,
    pub final_subtotal: Money,
    pub total_vat: Money,
    pub total: Money,
}

/// Prices a single line, rounding its VAT on its own.
pub fn price_line(line: &LinePricing) -> Result<LineAmounts, PricingError> {
    let subtotal = line.line_subtotal()?;
    let vat = Money::round_half_up(line.exact_vat()?)?;
    Ok(LineAmounts {
        subtotal,
        vat,
        total: subtotal.checked_add(vat)?,
    })
}

/// Sums line subtotals. Used to resolve vouchers before the summary exists.
pub fn subtotal(lines: &[LinePricing]) -> Result<Money, PricingError> {
    if lines.is_empty() {
        return Err(PricingError::NoLines);
    }
    lines
        .iter()
        .try_fold(Money::ZERO, |acc, line| acc.checked_add(line.line_subtotal()?))
}

/// Computes the order summary for `lines` with an already-resolved discount.
pub fn summarize(lines: &[LinePricing], discount: Money) -> Result<OrderSummary, PricingError> {
    let subtotal = subtotal(lines)?;

    if discount.is_negative() || discount > subtotal {
        return Err(PricingError::DiscountExceedsSubtotal { discount, subtotal });
    }

    let exact_vat = lines.iter().try_fold(Decimal::ZERO, |acc, line| {
        acc.checked_add(line.exact_vat()?)
            .ok_or(PricingError::AmountOverflow)
    })?;
    let total_vat = Money::round_half_up(exact_vat)?;
    let final_subtotal = subtotal.checked_sub(discount)?;

    Ok(OrderSummary {
        subtotal,
        voucher_discount: discount,
        final_subtotal,
        total_vat,
        total: final_subtotal.checked_add(total_vat)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(price: i64, rate: Decimal, qty: u32) -> LinePricing {
        LinePricing::new(Money::new(price), TaxRate::new(rate).unwrap(), qty)
    }

    #[test]
    fn prices_a_single_line() {
        let amounts = price_line(&line(200_000, dec!(0.10), 2)).unwrap();
        assert_eq!(amounts.subtotal, Money::new(400_000));
        assert_eq!(amounts.vat, Money::new(40_000));
        assert_eq!(amounts.total, Money::new(440_000));
    }

    #[test]
    fn summary_without_voucher() {
        let summary = summarize(&[line(200_000, dec!(0.10), 2)], Money::ZERO).unwrap();
        assert_eq!(summary.subtotal, Money::new(400_000));
        assert_eq!(summary.voucher_discount, Money::ZERO);
        assert_eq!(summary.final_subtotal, Money::new(400_000));
        assert_eq!(summary.total_vat, Money::new(40_000));
        assert_eq!(summary.total, Money::new(440_000));
    }

    #[test]
    fn discount_does_not_change_vat() {
        let summary = summarize(&[line(200_000, dec!(0.10), 2)], Money::new(40_000)).unwrap();
        assert_eq!(summary.final_subtotal, Money::new(360_000));
        assert_eq!(summary.total_vat, Money::new(40_000));
        assert_eq!(summary.total, Money::new(400_000));
    }

    #[test]
    fn vat_is_rounded_once_on_the_sum() {
        // Each line carries 0.5 of VAT: per-line display rounds to 1 each,
        // the order total rounds 1.5 to 2 rather than 1 + 1 + 1 = 3.
        let lines = [
            line(5, dec!(0.10), 1),
            line(5, dec!(0.10), 1),
            line(5, dec!(0.10), 1),
        ];
        let displayed = lines.iter().try_fold(Money::ZERO, |acc, l| {
            acc.checked_add(price_line(l).unwrap().vat)
        });
        assert_eq!(displayed, Ok(Money::new(3)));

        let summary = summarize(&lines, Money::ZERO).unwrap();
        assert_eq!(summary.total_vat, Money::new(2));
        assert_eq!(
            Ok(summary.total),
            summary.final_subtotal.checked_add(summary.total_vat)
        );
    }

    #[test]
    fn zero_price_and_zero_rate_are_valid() {
        let summary = summarize(&[line(0, dec!(0), 3)], Money::ZERO).unwrap();
        assert_eq!(summary.total, Money::ZERO);
    }

    #[test]
    fn rejects_invalid_lines() {
        assert_eq!(
            price_line(&line(100, dec!(0.1), 0)),
            Err(PricingError::ZeroQuantity)
        );
        assert!(matches!(
            price_line(&LinePricing::new(Money::new(-1), TaxRate::ZERO, 1)),
            Err(PricingError::NegativePrice(_))
        ));
        assert_eq!(summarize(&[], Money::ZERO), Err(PricingError::NoLines));
    }

    #[test]
    fn rejects_discount_above_subtotal() {
        let result = summarize(&[line(100, dec!(0.1), 1)], Money::new(101));
        assert!(matches!(
            result,
            Err(PricingError::DiscountExceedsSubtotal { .. })
        ));
    }

    #[test]
    fn overflow_is_an_error_not_a_panic() {
        let result = summarize(&[line(i64::MAX, dec!(0.1), 2)], Money::ZERO);
        assert_eq!(result, Err(PricingError::AmountOverflow));
    }

    #[test]
    fn full_rate_total_past_half_range_is_an_error() {
        let big = line(i64::MAX / 2 + 1, dec!(1), 1);
        assert_eq!(price_line(&big), Err(PricingError::AmountOverflow));
        assert_eq!(summarize(&[big], Money::ZERO), Err(PricingError::AmountOverflow));
    }

    #[test]
    fn total_identity_holds_across_mixed_rates() {
        let lines = [
            line(1_999, dec!(0.08), 3),
            line(45_050, dec!(0.10), 1),
            line(333, dec!(0.05), 7),
        ];
        for discount in [0, 17, 1_000] {
            let summary = summarize(&lines, Money::new(discount)).unwrap();
            assert_eq!(
                Ok(summary.total),
                summary.final_subtotal.checked_add(summary.total_vat)
            );
            assert_eq!(
                Ok(summary.final_subtotal),
                summary.subtotal.checked_sub(summary.voucher_discount)
            );
        }
    }
}
