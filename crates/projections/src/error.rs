//! Errors raised while feeding the read models.

use common::AggregateId;
use event_store::{EventEnvelope, EventStoreError, Version};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("reading the event log failed: {0}")]
    Store(#[from] EventStoreError),

    /// A stored payload no longer matches the order event schema.
    #[error("{event_type} v{version} of {aggregate_id} is unreadable: {source}")]
    UnreadablePayload {
        aggregate_id: AggregateId,
        version: Version,
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProjectionError {
    pub(crate) fn unreadable(event: &EventEnvelope, source: serde_json::Error) -> Self {
        Self::UnreadablePayload {
            aggregate_id: event.aggregate_id,
            version: event.version,
            event_type: event.event_type.clone(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
