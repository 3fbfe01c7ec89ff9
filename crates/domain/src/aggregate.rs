//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// A fact recorded against an aggregate. Named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Event type name stored alongside the payload.
    fn event_type(&self) -> &'static str;
}

/// An event-sourced aggregate.
///
/// The aggregate is rebuilt by replaying its events through [`Aggregate::apply`].
/// Commands are plain methods that inspect the current state and return the
/// events to record; they never mutate.
pub trait Aggregate: Default + Send + Sync + Sized {
    type Event: DomainEvent;

    type Error: std::error::Error + Send + Sync;

    fn aggregate_type() -> &'static str;

    /// `None` until the first event has been applied.
    fn id(&self) -> Option<AggregateId>;

    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    /// Applies an event. Must be deterministic and infallible.
    fn apply(&mut self, event: Self::Event);

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
