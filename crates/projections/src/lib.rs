//! Read models and projections for the order query side.
//!
//! - [`Projection`] trait for processing events into read models, each
//!   guarded by a per-order [`Checkpoint`]
//! - [`ReadModel`] trait for query access to denormalized data
//! - [`ProjectionProcessor`] for feeding events from the store to projections
//! - [`OrderListView`] for customer and admin order listings
//! - [`ReturnQueueView`] for returns awaiting an admin decision

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Checkpoint, Projection};
pub use read_model::ReadModel;
pub use views::{OrderListEntry, OrderListView, PendingReturn, ReturnQueueView};
