use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, EventEnvelope, EventId, EventStoreError, Result, StockChange, StockDirection,
    Version,
    stock::Inventory,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

/// Narrows a `product_stock.available` BIGINT to the inventory's `u32`.
fn stock_level_from_column(product_id: &str, level: i64) -> Result<u32> {
    u32::try_from(level).map_err(|_| EventStoreError::StockOutOfRange {
        product_id: product_id.to_string(),
        level,
    })
}

/// PostgreSQL-backed event store.
///
/// Events go to the `events` table and stock levels to `product_stock`. An
/// append runs in a single transaction, so stock changes attached to it are
/// rolled back together with the events on any failure.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            version: Version::new(row.try_get("version")?),
            timestamp: row.try_get("timestamp")?,
            payload: row.try_get("payload")?,
        })
    }

    /// Applies one conditional stock update inside `tx`.
    async fn apply_stock_change(
        tx: &mut Transaction<'_, Postgres>,
        change: &StockChange,
    ) -> Result<u32> {
        let quantity = i64::from(change.quantity);
        let updated: Option<i64> = match change.direction {
            StockDirection::Decrement => {
                sqlx::query_scalar(
                    r#"
                    UPDATE product_stock
                    SET available = available - $2
                    WHERE product_id = $1 AND available >= $2
                    RETURNING available
                    "#,
                )
                .bind(&change.product_id)
                .bind(quantity)
                .fetch_optional(&mut **tx)
                .await?
            }
            StockDirection::Increment => {
                sqlx::query_scalar(
                    r#"
                    UPDATE product_stock
                    SET available = available + $2
                    WHERE product_id = $1
                    RETURNING available
                    "#,
                )
                .bind(&change.product_id)
                .bind(quantity)
                .fetch_optional(&mut **tx)
                .await?
            }
        };

        if let Some(level) = updated {
            return stock_level_from_column(&change.product_id, level);
        }

        let available: Option<i64> =
            sqlx::query_scalar("SELECT available FROM product_stock WHERE product_id = $1")
                .bind(&change.product_id)
                .fetch_optional(&mut **tx)
                .await?;

        match available {
            Some(available) => Err(EventStoreError::InsufficientStock {
                product_id: change.product_id.clone(),
                requested: change.quantity,
                available: stock_level_from_column(&change.product_id, available)?,
            }),
            None => Err(EventStoreError::UnknownProduct(change.product_id.clone())),
        }
    }

    async fn apply_single_change(&self, change: StockChange) -> Result<u32> {
        let mut tx = self.pool.begin().await?;
        let level = Self::apply_stock_change(&mut tx, &change).await?;
        tx.commit().await?;
        Ok(level)
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let aggregate_id = events[0].aggregate_id;
        let started = std::time::Instant::now();
        let mut tx = self.pool.begin().await?;

        if let Some(expected) = options.expected_version {
            let current_version: Option<i64> =
                sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                    .bind(aggregate_id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await?;

            let actual = Version::new(current_version.unwrap_or(0));
            if actual != expected {
                return Err(EventStoreError::ConcurrencyConflict {
                    aggregate_id,
                    expected,
                    actual,
                });
            }
        }

        // Fixed lock order across transactions touching the same products.
        let mut changes = options.stock_changes.clone();
        changes.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        for change in &changes {
            Self::apply_stock_change(&mut tx, change).await?;
        }

        let mut last_version = Version::initial();
        for event in &events {
            sqlx::query(
                r#"
                INSERT INTO events (id, event_type, aggregate_id, aggregate_type, version, timestamp, payload)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(event.event_id.as_uuid())
            .bind(&event.event_type)
            .bind(event.aggregate_id.as_uuid())
            .bind(&event.aggregate_type)
            .bind(event.version.as_i64())
            .bind(event.timestamp)
            .bind(&event.payload)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_aggregate_version")
                {
                    return EventStoreError::ConcurrencyConflict {
                        aggregate_id,
                        expected: options.expected_version.unwrap_or(Version::initial()),
                        actual: event.version,
                    };
                }
                EventStoreError::Database(e)
            })?;

            last_version = event.version;
        }

        tx.commit().await?;
        metrics::histogram!("event_store_append_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        Ok(last_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, aggregate_id, aggregate_type, version, timestamp, payload
            FROM events
            WHERE aggregate_id = $1
            ORDER BY version ASC
            "#,
        )
        .bind(aggregate_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::StreamExt;

        let stream = sqlx::query(
            r#"
            SELECT id, event_type, aggregate_id, aggregate_type, version, timestamp, payload
            FROM events
            ORDER BY sequence ASC
            "#,
        )
        .fetch(&self.pool)
        .map(|result| match result {
            Ok(row) => Self::row_to_event(row),
            Err(e) => Err(EventStoreError::Database(e)),
        });

        Ok(Box::pin(stream))
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }
}

#[async_trait]
impl Inventory for PostgresEventStore {
    async fn stock_level(&self, product_id: &str) -> Result<Option<u32>> {
        let available: Option<i64> =
            sqlx::query_scalar("SELECT available FROM product_stock WHERE product_id = $1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;
        available
            .map(|level| stock_level_from_column(product_id, level))
            .transpose()
    }

    async fn set_stock(&self, product_id: &str, available: u32) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO product_stock (product_id, available)
            VALUES ($1, $2)
            ON CONFLICT (product_id) DO UPDATE SET available = EXCLUDED.available
            "#,
        )
        .bind(product_id)
        .bind(i64::from(available))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn decrement_if_available(&self, product_id: &str, quantity: u32) -> Result<u32> {
        self.apply_single_change(StockChange::decrement(product_id, quantity))
            .await
    }

    async fn increment(&self, product_id: &str, quantity: u32) -> Result<u32> {
        self.apply_single_change(StockChange::increment(product_id, quantity))
            .await
    }
}
