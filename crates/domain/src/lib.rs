//! Domain layer for the storefront order engine.
//!
//! This crate provides:
//! - Aggregate, DomainEvent and CommandHandler for event-sourced aggregates
//! - Pricing: money, VAT calculation and vouchers
//! - The order aggregate with its status and return state machines
//! - Invoice projection, catalog lookup and caller authorization
//! - `OrderService`, the entry point for every order action

pub mod aggregate;
pub mod auth;
pub mod catalog;
pub mod command;
pub mod error;
pub mod invoice;
pub mod order;
pub mod pricing;

pub use aggregate::{Aggregate, DomainEvent};
pub use auth::{Authorizer, Caller, RoleAuthorizer};
pub use catalog::{CatalogProduct, InMemoryCatalog, ProductCatalog};
pub use command::{Command, CommandHandler, CommandResult, Decision};
pub use error::{DomainError, ErrorKind};
pub use invoice::{AvailableActions, Invoice, InvoiceLine};
pub use order::{
    ApproveReturn, CartLine, Checkout, CustomerId, CustomerKind, CustomerSnapshot, MediaRef,
    Order, OrderError, OrderEvent, OrderLineItem, OrderPolicy, OrderService, OrderStatus,
    ProductId, RejectReturn, ReturnIneligibility, ReturnRequest, ReturnStatus, SetStatus,
    SubmitReturn,
};
pub use pricing::{
    Money, OrderSummary, PricingError, TaxRate, VoucherApplication, VoucherCatalog, VoucherKind,
    VoucherRejection, VoucherResolution,
};
