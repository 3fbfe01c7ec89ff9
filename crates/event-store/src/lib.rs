//! Event storage for the order engine.
//!
//! Orders are persisted as an append-only stream of events per aggregate.
//! Stock levels live next to the events so that an append and its stock
//! adjustments commit as one unit of work.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod stock;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use stock::{Inventory, StockChange, StockDirection};
pub use store::{AppendOptions, EventStore, EventStream};
