//! Command handling infrastructure.

use std::marker::PhantomData;

use common::AggregateId;
use event_store::{
    AppendOptions, EventEnvelope, EventStore, EventStoreError, StockChange, Version,
};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Default number of times a command is re-run after losing a version race.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// What a command decided: the events to record and any stock adjustments
/// that must commit with them.
#[derive(Debug, Clone)]
pub struct Decision<E> {
    pub events: Vec<E>,
    pub stock_changes: Vec<StockChange>,
}

impl<E> Decision<E> {
    pub fn new(events: Vec<E>) -> Self {
        Self {
            events,
            stock_changes: Vec::new(),
        }
    }

    pub fn with_stock_changes(mut self, changes: Vec<StockChange>) -> Self {
        self.stock_changes = changes;
        self
    }
}

impl<E> From<Vec<E>> for Decision<E> {
    fn from(events: Vec<E>) -> Self {
        Self::new(events)
    }
}

/// An intention to change one aggregate. It may be rejected by the
/// aggregate's current state.
pub trait Command: Send + Sync {
    type Aggregate: Aggregate;

    fn aggregate_id(&self) -> AggregateId;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were persisted.
    pub events: Vec<A::Event>,

    pub new_version: Version,
}

/// Loads aggregates by replaying their events and persists command output
/// with optimistic concurrency.
///
/// A command that loses a version race is re-run against freshly loaded
/// state, so it is re-validated rather than overwriting the winner. After
/// `max_retries` lost races the conflict is returned to the caller.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    max_retries: u32,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_retries: DEFAULT_MAX_RETRIES,
            _phantom: PhantomData,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate. Returns a default instance if it has no events.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let events = self.store.get_events_for_aggregate(aggregate_id).await?;

        let mut aggregate = A::default();
        for envelope in events {
            let event: A::Event = serde_json::from_value(envelope.payload)?;
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }

        Ok(aggregate)
    }

    /// Loads an aggregate, returning `None` if it doesn't exist.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Runs `command_fn` against the current state and persists its decision.
    ///
    /// `command_fn` may be called more than once if another writer appends to
    /// the same aggregate in between.
    pub async fn execute<F, D>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<D, A::Error>,
        D: Into<Decision<A::Event>>,
        DomainError: From<A::Error>,
    {
        let mut attempt = 0;
        loop {
            let mut aggregate = self.load(aggregate_id).await?;
            let current_version = aggregate.version();

            let decision: Decision<A::Event> = command_fn(&aggregate)?.into();
            if decision.events.is_empty() {
                return Ok(CommandResult {
                    aggregate,
                    events: vec![],
                    new_version: current_version,
                });
            }

            let envelopes = build_envelopes::<A>(aggregate_id, current_version, &decision.events)?;
            let options = AppendOptions::expect_version(current_version)
                .with_stock_changes(decision.stock_changes);

            match self.store.append(envelopes, options).await {
                Ok(new_version) => {
                    aggregate.apply_events(decision.events.iter().cloned());
                    aggregate.set_version(new_version);
                    return Ok(CommandResult {
                        aggregate,
                        events: decision.events,
                        new_version,
                    });
                }
                Err(EventStoreError::ConcurrencyConflict { .. }) if attempt < self.max_retries => {
                    attempt += 1;
                    metrics::counter!(
                        "command_conflict_retries_total",
                        "aggregate_type" => A::aggregate_type()
                    )
                    .increment(1);
                    tracing::debug!(%aggregate_id, attempt, "version conflict, retrying command");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn build_envelopes<A: Aggregate>(
    aggregate_id: AggregateId,
    current_version: Version,
    events: &[A::Event],
) -> Result<Vec<EventEnvelope>, DomainError> {
    let mut version = current_version;
    events
        .iter()
        .map(|event| {
            version = version.next();
            Ok(EventEnvelope::builder()
                .aggregate_id(aggregate_id)
                .aggregate_type(A::aggregate_type())
                .event_type(event.event_type())
                .version(version)
                .payload(event)?
                .build()?)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use event_store::{EventStream, InMemoryEventStore, Inventory};
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum TicketEvent {
        Opened { id: AggregateId },
        Claimed { by: String },
    }

    impl DomainEvent for TicketEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TicketEvent::Opened { .. } => "TicketOpened",
                TicketEvent::Claimed { .. } => "TicketClaimed",
            }
        }
    }

    #[derive(Debug, Default)]
    struct Ticket {
        id: Option<AggregateId>,
        claimed_by: Option<String>,
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    enum TicketError {
        #[error("already claimed by {0}")]
        AlreadyClaimed(String),
    }

    impl From<TicketError> for DomainError {
        fn from(e: TicketError) -> Self {
            DomainError::Forbidden(e.to_string())
        }
    }

    impl Aggregate for Ticket {
        type Event = TicketEvent;
        type Error = TicketError;

        fn aggregate_type() -> &'static str {
            "Ticket"
        }

        fn id(&self) -> Option<AggregateId> {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                TicketEvent::Opened { id } => self.id = Some(id),
                TicketEvent::Claimed { by } => self.claimed_by = Some(by),
            }
        }
    }

    fn claim(by: &str) -> impl Fn(&Ticket) -> Result<Vec<TicketEvent>, TicketError> + '_ {
        move |ticket| match &ticket.claimed_by {
            Some(owner) => Err(TicketError::AlreadyClaimed(owner.clone())),
            None => Ok(vec![TicketEvent::Claimed { by: by.to_string() }]),
        }
    }

    async fn open(handler: &CommandHandler<impl EventStore, Ticket>) -> AggregateId {
        let id = AggregateId::new();
        handler
            .execute(id, |_| Ok::<_, TicketError>(vec![TicketEvent::Opened { id }]))
            .await
            .unwrap();
        id
    }

    /// Appends a rival claim right before the first append it forwards.
    #[derive(Clone)]
    struct RacingStore {
        inner: InMemoryEventStore,
        raced: Arc<AtomicBool>,
    }

    #[async_trait]
    impl EventStore for RacingStore {
        async fn append(
            &self,
            events: Vec<EventEnvelope>,
            options: AppendOptions,
        ) -> event_store::Result<Version> {
            if events[0].event_type == "TicketClaimed" && !self.raced.swap(true, Ordering::SeqCst)
            {
                let rival = EventEnvelope::builder()
                    .aggregate_id(events[0].aggregate_id)
                    .aggregate_type("Ticket")
                    .event_type("TicketClaimed")
                    .version(events[0].version)
                    .payload(&TicketEvent::Claimed {
                        by: "rival".to_string(),
                    })?
                    .build()?;
                self.inner.append(vec![rival], AppendOptions::new()).await?;
            }
            self.inner.append(events, options).await
        }

        async fn get_events_for_aggregate(
            &self,
            aggregate_id: AggregateId,
        ) -> event_store::Result<Vec<EventEnvelope>> {
            self.inner.get_events_for_aggregate(aggregate_id).await
        }

        async fn stream_all_events(&self) -> event_store::Result<EventStream> {
            self.inner.stream_all_events().await
        }

        async fn get_aggregate_version(
            &self,
            aggregate_id: AggregateId,
        ) -> event_store::Result<Option<Version>> {
            self.inner.get_aggregate_version(aggregate_id).await
        }
    }

    #[tokio::test]
    async fn execute_creates_aggregate() {
        let handler: CommandHandler<_, Ticket> = CommandHandler::new(InMemoryEventStore::new());
        let id = open(&handler).await;

        let ticket = handler.load_existing(id).await.unwrap().unwrap();
        assert_eq!(ticket.id(), Some(id));
        assert_eq!(ticket.version(), Version::first());
    }

    #[tokio::test]
    async fn execute_applies_events_to_returned_aggregate() {
        let handler: CommandHandler<_, Ticket> = CommandHandler::new(InMemoryEventStore::new());
        let id = open(&handler).await;

        let result = handler.execute(id, claim("alice")).await.unwrap();

        assert_eq!(result.new_version, Version::new(2));
        assert_eq!(result.aggregate.claimed_by.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn rejected_command_persists_nothing() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Ticket> = CommandHandler::new(store.clone());
        let id = open(&handler).await;
        handler.execute(id, claim("alice")).await.unwrap();

        let result = handler.execute(id, claim("bob")).await;

        assert!(result.is_err());
        assert_eq!(store.event_count().await, 2);
    }

    #[tokio::test]
    async fn load_existing_returns_none_for_unknown_id() {
        let handler: CommandHandler<_, Ticket> = CommandHandler::new(InMemoryEventStore::new());
        assert!(handler.load_existing(AggregateId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_decision_returns_without_persisting() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Ticket> = CommandHandler::new(store.clone());

        let result = handler
            .execute(AggregateId::new(), |_| Ok::<_, TicketError>(Vec::new()))
            .await
            .unwrap();

        assert!(result.events.is_empty());
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn lost_race_is_revalidated_against_the_winner() {
        let inner = InMemoryEventStore::new();
        let store = RacingStore {
            inner: inner.clone(),
            raced: Arc::new(AtomicBool::new(false)),
        };
        let handler: CommandHandler<_, Ticket> = CommandHandler::new(store);
        let id = open(&handler).await;

        let result = handler.execute(id, claim("alice")).await;

        assert!(matches!(result, Err(DomainError::Forbidden(ref m)) if m.contains("rival")));
        assert_eq!(inner.event_count().await, 2);
    }

    #[tokio::test]
    async fn conflict_surfaces_when_retries_are_exhausted() {
        let store = RacingStore {
            inner: InMemoryEventStore::new(),
            raced: Arc::new(AtomicBool::new(false)),
        };
        let handler: CommandHandler<_, Ticket> = CommandHandler::new(store).with_max_retries(0);
        let id = open(&handler).await;

        let result = handler.execute(id, claim("alice")).await;

        assert!(matches!(
            result,
            Err(DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. }))
        ));
    }

    #[tokio::test]
    async fn stock_changes_commit_with_the_decision() {
        let store = InMemoryEventStore::new();
        store.set_stock("SKU-1", 3).await.unwrap();
        let handler: CommandHandler<_, Ticket> = CommandHandler::new(store.clone());
        let id = AggregateId::new();

        handler
            .execute(id, |_| {
                Ok::<_, TicketError>(
                    Decision::new(vec![TicketEvent::Opened { id }])
                        .with_stock_changes(vec![StockChange::decrement("SKU-1", 2)]),
                )
            })
            .await
            .unwrap();

        assert_eq!(store.stock_level("SKU-1").await.unwrap(), Some(1));
    }
}
