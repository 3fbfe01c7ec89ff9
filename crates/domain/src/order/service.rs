//! Order service: the entry points for every order action.

use std::sync::Arc;

use common::{AggregateId, Clock, SystemClock};
use event_store::{EventEnvelope, EventStore};

use crate::auth::{Authorizer, Caller, RoleAuthorizer};
use crate::catalog::ProductCatalog;
use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::invoice::Invoice;
use crate::pricing::{self, Money, PricingError, VoucherCatalog, VoucherResolution};

use super::{
    ApproveReturn, Checkout, Order, OrderError, OrderLineItem, OrderPolicy, RejectReturn,
    SetStatus, SubmitReturn,
};

/// Service for managing orders.
///
/// Every operation checks the caller first, then runs as a single command
/// against the order's event stream. Stock changes ride on the same append,
/// so an operation either fully happens or leaves no trace.
pub struct OrderService<S: EventStore> {
    handler: CommandHandler<S, Order>,
    catalog: Arc<dyn ProductCatalog>,
    vouchers: VoucherCatalog,
    authorizer: Arc<dyn Authorizer>,
    clock: Arc<dyn Clock>,
    policy: OrderPolicy,
}

impl<S: EventStore> OrderService<S> {
    /// Creates a service with role-based authorization, the system clock,
    /// the standard vouchers and the default policy.
    pub fn new(store: S, catalog: Arc<dyn ProductCatalog>) -> Self {
        let policy = OrderPolicy::default();
        Self {
            handler: CommandHandler::new(store).with_max_retries(policy.max_command_retries),
            catalog,
            vouchers: VoucherCatalog::standard(),
            authorizer: Arc::new(RoleAuthorizer),
            clock: Arc::new(SystemClock),
            policy,
        }
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_vouchers(mut self, vouchers: VoucherCatalog) -> Self {
        self.vouchers = vouchers;
        self
    }

    pub fn with_policy(mut self, policy: OrderPolicy) -> Self {
        self.handler = self.handler.with_max_retries(policy.max_command_retries);
        self.policy = policy;
        self
    }

    pub fn handler(&self) -> &CommandHandler<S, Order> {
        &self.handler
    }

    pub fn authorizer(&self) -> &dyn Authorizer {
        self.authorizer.as_ref()
    }

    pub fn policy(&self) -> &OrderPolicy {
        &self.policy
    }

    /// Places an order for the calling customer.
    ///
    /// Prices and tax rates come from the catalog, never from the cart. An
    /// unknown voucher fails the whole checkout.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, caller = %caller))]
    pub async fn checkout(
        &self,
        caller: &Caller,
        cmd: Checkout,
    ) -> Result<CommandResult<Order>, DomainError> {
        let result = self.place_order(caller, cmd).await;
        match &result {
            Ok(placed) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(total = %placed.aggregate.summary().total, "order placed");
            }
            Err(e) => {
                metrics::counter!("checkout_rejections_total", "reason" => e.kind().as_str())
                    .increment(1);
                tracing::warn!(error = %e, "checkout rejected");
            }
        }
        result
    }

    async fn place_order(
        &self,
        caller: &Caller,
        cmd: Checkout,
    ) -> Result<CommandResult<Order>, DomainError> {
        if !self.authorizer.acts_for(caller, cmd.customer.customer_id) {
            return Err(DomainError::Forbidden(
                "checkout must be made by the ordering customer".to_string(),
            ));
        }
        if cmd.lines.is_empty() {
            return Err(OrderError::NoItems.into());
        }

        let mut items = Vec::with_capacity(cmd.lines.len());
        for line in &cmd.lines {
            if line.quantity == 0 {
                return Err(PricingError::ZeroQuantity.into());
            }
            let product = self
                .catalog
                .product(&line.product_id)
                .await?
                .ok_or_else(|| DomainError::ProductNotFound(line.product_id.clone()))?;
            items.push(OrderLineItem {
                product_id: product.product_id,
                product_name: product.name,
                size: line.size.clone(),
                color: line.color.clone(),
                unit_price: product.unit_price,
                tax_rate: product.tax_rate,
                quantity: line.quantity,
            });
        }

        let voucher = match cmd.voucher() {
            None => None,
            Some(code) => {
                let lines: Vec<_> = items.iter().map(OrderLineItem::pricing).collect();
                match self.vouchers.resolve(code, pricing::subtotal(&lines)?)? {
                    VoucherResolution::Valid(application) => Some(application),
                    VoucherResolution::Invalid { code, reason } => {
                        return Err(DomainError::VoucherInvalid { code, reason });
                    }
                }
            }
        };

        let order_id = cmd.order_id;
        let customer = cmd.customer;
        let now = self.clock.now();
        self.handler
            .execute(order_id, |order| {
                order.place(
                    order_id,
                    customer.clone(),
                    items.clone(),
                    voucher.clone(),
                    now,
                )
            })
            .await
    }

    /// Moves an order to a new status. Admin only.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, target = %cmd.target, caller = %caller))]
    pub async fn set_status(
        &self,
        caller: &Caller,
        cmd: SetStatus,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.require_admin(caller, "change order status")?;

        let order_id = cmd.order_id;
        let now = self.clock.now();
        let result = self
            .handler
            .execute(order_id, |order| {
                order.transition(cmd.target, cmd.reason.clone(), now)
            })
            .await
            .map_err(|e| not_found_as(order_id, e))?;

        metrics::counter!("order_status_transitions_total", "to" => cmd.target.as_str())
            .increment(1);
        tracing::info!("order status changed");
        Ok(result)
    }

    /// Opens a return for a completed order. Only the ordering customer may
    /// do this.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, caller = %caller))]
    pub async fn submit_return(
        &self,
        caller: &Caller,
        cmd: SubmitReturn,
    ) -> Result<CommandResult<Order>, DomainError> {
        let order = self.require_order(cmd.order_id).await?;
        if !self.owns(caller, &order) {
            return Err(DomainError::Forbidden(
                "only the ordering customer can request a return".to_string(),
            ));
        }

        let window = self.policy.return_window;
        let now = self.clock.now();
        let result = self
            .handler
            .execute(cmd.order_id, |order| {
                order.request_return(&cmd.reason, cmd.media.clone(), window, now)
            })
            .await;

        match &result {
            Ok(_) => {
                metrics::counter!("return_requests_total", "outcome" => "accepted").increment(1);
                tracing::info!("return requested");
            }
            Err(e) => {
                metrics::counter!("return_requests_total", "outcome" => "rejected").increment(1);
                tracing::warn!(error = %e, "return request rejected");
            }
        }
        result
    }

    /// Approves a requested return, refunding and restocking atomically.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, caller = %caller))]
    pub async fn approve_return(
        &self,
        caller: &Caller,
        cmd: ApproveReturn,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.require_admin(caller, "approve returns")?;

        let now = self.clock.now();
        let result = self
            .handler
            .execute(cmd.order_id, |order| order.approve_return(now))
            .await
            .map_err(|e| not_found_as(cmd.order_id, e))?;

        metrics::counter!("returns_resolved_total", "outcome" => "approved").increment(1);
        tracing::info!("return approved");
        Ok(result)
    }

    /// Rejects a requested return. The order is left otherwise untouched.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, caller = %caller))]
    pub async fn reject_return(
        &self,
        caller: &Caller,
        cmd: RejectReturn,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.require_admin(caller, "reject returns")?;

        let now = self.clock.now();
        let result = self
            .handler
            .execute(cmd.order_id, |order| order.reject_return(now))
            .await
            .map_err(|e| not_found_as(cmd.order_id, e))?;

        metrics::counter!("returns_resolved_total", "outcome" => "rejected").increment(1);
        tracing::info!("return rejected");
        Ok(result)
    }

    /// Builds the invoice for the owning customer or an admin.
    ///
    /// A missing order is reported as not found before ownership is checked.
    #[tracing::instrument(skip(self), fields(caller = %caller))]
    pub async fn get_invoice(
        &self,
        caller: &Caller,
        order_id: AggregateId,
    ) -> Result<Invoice, DomainError> {
        let order = self.require_order(order_id).await?;
        if !self.authorizer.is_admin(caller) && !self.owns(caller, &order) {
            return Err(DomainError::Forbidden(
                "this order belongs to another customer".to_string(),
            ));
        }
        Ok(Invoice::project(&order)?)
    }

    /// Loads an order by ID without any authorization check.
    pub async fn get_order(&self, order_id: AggregateId) -> Result<Option<Order>, DomainError> {
        self.handler.load_existing(order_id).await
    }

    /// The stored event history of an order. Admin only.
    #[tracing::instrument(skip(self), fields(caller = %caller))]
    pub async fn order_events(
        &self,
        caller: &Caller,
        order_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        self.require_admin(caller, "read order history")?;
        let events = self
            .handler
            .store()
            .get_events_for_aggregate(order_id)
            .await?;
        if events.is_empty() {
            return Err(DomainError::OrderNotFound(order_id));
        }
        Ok(events)
    }

    /// Resolves a voucher code without placing anything.
    pub fn preview_voucher(
        &self,
        code: &str,
        subtotal: Money,
    ) -> Result<VoucherResolution, DomainError> {
        if subtotal.is_negative() {
            return Err(PricingError::NegativePrice(subtotal).into());
        }
        Ok(self.vouchers.resolve(code, subtotal)?)
    }

    fn require_admin(&self, caller: &Caller, action: &str) -> Result<(), DomainError> {
        if self.authorizer.is_admin(caller) {
            Ok(())
        } else {
            Err(DomainError::Forbidden(format!("only admins can {action}")))
        }
    }

    fn owns(&self, caller: &Caller, order: &Order) -> bool {
        order
            .customer()
            .is_some_and(|c| self.authorizer.acts_for(caller, c.customer_id))
    }

    async fn require_order(&self, order_id: AggregateId) -> Result<Order, DomainError> {
        self.handler
            .load_existing(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))
    }
}

fn not_found_as(order_id: AggregateId, error: DomainError) -> DomainError {
    match error {
        DomainError::Order(OrderError::NotPlaced) => DomainError::OrderNotFound(order_id),
        other => other,
    }
}
