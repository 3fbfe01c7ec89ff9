//! Caller identity and authorization checks.

use crate::order::CustomerId;

/// Who is calling an order operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Customer(CustomerId),
    /// Staff member, identified by name for the logs.
    Admin(String),
}

impl std::fmt::Display for Caller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Caller::Anonymous => write!(f, "anonymous"),
            Caller::Customer(id) => write!(f, "customer:{id}"),
            Caller::Admin(name) => write!(f, "admin:{name}"),
        }
    }
}

/// Authorization capability consulted by every service entry point.
pub trait Authorizer: Send + Sync {
    fn is_admin(&self, caller: &Caller) -> bool;

    /// Whether `caller` may act as `customer_id`.
    fn acts_for(&self, caller: &Caller, customer_id: CustomerId) -> bool;
}

/// Grants rights straight from the caller's role.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAuthorizer;

impl Authorizer for RoleAuthorizer {
    fn is_admin(&self, caller: &Caller) -> bool {
        matches!(caller, Caller::Admin(_))
    }

    fn acts_for(&self, caller: &Caller, customer_id: CustomerId) -> bool {
        matches!(caller, Caller::Customer(id) if *id == customer_id)
    }
}
