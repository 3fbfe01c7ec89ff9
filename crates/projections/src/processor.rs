//! Feeds the event log into the registered read models.

use event_store::EventStore;
use futures_util::StreamExt;

use crate::Result;
use crate::projection::Projection;

/// Streams the event log through every registered projection.
///
/// Each projection keeps its own [`Checkpoint`](crate::Checkpoint), so a pass
/// can be repeated or overlap an earlier one: an event reaches a view at most
/// once, and an event that committed late is still picked up by the next pass.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
        }
    }

    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Brings every projection up to date with the log.
    ///
    /// Returns how many deliveries changed a view.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<u64> {
        let mut stream = self.store.stream_all_events().await?;
        let mut scanned: u64 = 0;
        let mut applied: u64 = 0;

        while let Some(event) = stream.next().await {
            let event = event?;
            scanned += 1;

            for projection in &self.projections {
                if projection.handle(&event).await? {
                    applied += 1;
                    metrics::counter!("projection_events_applied_total", "view" => projection.name())
                        .increment(1);
                }
            }
        }

        if applied > 0 {
            tracing::info!(scanned, applied, "read models caught up");
        } else {
            tracing::debug!(scanned, "read models already current");
        }
        Ok(applied)
    }

    /// Clears every projection and replays the whole log.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<u64> {
        for projection in &self.projections {
            projection.reset().await?;
        }
        self.run_catch_up().await
    }
}
