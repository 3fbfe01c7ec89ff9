//! Read model views for the query side.

pub mod order_list;
pub mod return_queue;

pub use order_list::{OrderListEntry, OrderListView};
pub use return_queue::{PendingReturn, ReturnQueueView};
