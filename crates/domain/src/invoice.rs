//! Invoice projection of an order.
//!
//! An invoice only presents what the order stored at checkout and through
//! its lifecycle. Nothing is re-priced and the current time is never read,
//! so projecting the same order twice yields identical invoices.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::order::{
    CustomerSnapshot, Order, OrderError, OrderLineItem, OrderStatus, ProductId, ReturnRequest,
    ReturnStatus,
};
use crate::pricing::{Money, OrderSummary, TaxRate, VoucherApplication, price_line};

/// One line as printed on the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub unit_price: Money,
    pub tax_rate: TaxRate,
    pub quantity: u32,
    pub subtotal: Money,
    /// Rounded for display only; the order's VAT total is computed separately.
    pub vat_amount: Money,
    pub total: Money,
}

impl InvoiceLine {
    fn from_item(item: &OrderLineItem) -> Result<Self, OrderError> {
        let amounts = price_line(&item.pricing())?;
        Ok(Self {
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            size: item.size.clone(),
            color: item.color.clone(),
            unit_price: item.unit_price,
            tax_rate: item.tax_rate,
            quantity: item.quantity,
            subtotal: amounts.subtotal,
            vat_amount: amounts.vat,
            total: amounts.total,
        })
    }
}

/// Next steps offered for an order, straight from the transition tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableActions {
    pub status: Vec<OrderStatus>,
    pub returns: Vec<ReturnStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub order_id: AggregateId,
    pub customer: CustomerSnapshot,
    pub lines: Vec<InvoiceLine>,
    pub voucher: Option<VoucherApplication>,
    pub summary: OrderSummary,
    pub status: OrderStatus,
    pub return_status: ReturnStatus,
    pub return_request: Option<ReturnRequest>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub available_actions: AvailableActions,
}

impl Invoice {
    /// Projects a placed order. Lines keep their checkout order.
    pub fn project(order: &Order) -> Result<Self, OrderError> {
        let (Some(order_id), Some(customer)) = (order.id(), order.customer()) else {
            return Err(OrderError::NotPlaced);
        };

        let lines = order
            .items()
            .iter()
            .map(InvoiceLine::from_item)
            .collect::<Result<Vec<_>, _>>()?;

        // Returns only become possible once the order is completed.
        let returns = if order.status() == OrderStatus::Completed {
            order.return_status().allowed_transitions()
        } else {
            Vec::new()
        };

        Ok(Self {
            order_id,
            customer: customer.clone(),
            lines,
            voucher: order.voucher().cloned(),
            summary: *order.summary(),
            status: order.status(),
            return_status: order.return_status(),
            return_request: order.return_request().cloned(),
            created_at: order.created_at(),
            paid_at: order.paid_at(),
            completed_at: order.completed_at(),
            cancelled_at: order.cancelled_at(),
            cancellation_reason: order.cancellation_reason().map(str::to_string),
            refunded_at: order.refunded_at(),
            available_actions: AvailableActions {
                status: order.status().allowed_transitions(),
                returns,
            },
        })
    }
}
