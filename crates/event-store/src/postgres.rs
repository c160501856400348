use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    EventData, EventEnvelope, EventStoreError, Metadata, Result, Snapshot, StreamId, Version,
    store::{EventStore, SnapshotStore},
};

const UNIQUE_STREAM_VERSION: &str = "unique_stream_version";

/// PostgreSQL-backed event store implementation.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        let metadata = row
            .try_get::<Option<serde_json::Value>, _>("metadata")?
            .map(serde_json::from_value::<Metadata>)
            .transpose()?;

        Ok(EventEnvelope {
            stream_id: StreamId::from_uuid(row.try_get::<Uuid, _>("stream_id")?),
            version: Version::new(row.try_get("version")?),
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            occurred_on_utc: row.try_get("occurred_on_utc")?,
            metadata,
        })
    }

    async fn insert_events(
        conn: &mut PgConnection,
        stream_id: StreamId,
        expected_version: Version,
        events: Vec<EventData>,
        metadata: Option<&serde_json::Value>,
    ) -> std::result::Result<Version, sqlx::Error> {
        let occurred_on_utc = Utc::now();
        let mut version = expected_version;

        for event in events {
            version = version.next();

            sqlx::query(
                r#"
                INSERT INTO events
                    (stream_id, version, event_type, payload, occurred_on_utc, metadata)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(stream_id.as_uuid())
            .bind(version.as_i64())
            .bind(&event.event_type)
            .bind(&event.payload)
            .bind(occurred_on_utc)
            .bind(metadata)
            .execute(&mut *conn)
            .await?;
        }

        Ok(version)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.constraint() == Some(UNIQUE_STREAM_VERSION)
    )
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn read_stream(&self, stream_id: StreamId) -> Result<Vec<EventEnvelope>> {
        self.read_stream_from(stream_id, Version::first()).await
    }

    async fn read_stream_from(
        &self,
        stream_id: StreamId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(
            r#"
            SELECT stream_id, version, event_type, payload, occurred_on_utc, metadata
            FROM events
            WHERE stream_id = $1 AND version >= $2
            ORDER BY version ASC
            "#,
        )
        .bind(stream_id.as_uuid())
        .bind(from_version.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    #[tracing::instrument(skip(self, events, metadata), fields(event_count = events.len()))]
    async fn append_to_stream(
        &self,
        stream_id: StreamId,
        expected_version: Version,
        events: Vec<EventData>,
        metadata: Option<Metadata>,
    ) -> Result<Version> {
        let metadata_json = metadata.as_ref().map(serde_json::to_value).transpose()?;
        let appended = events.len();

        let mut tx = self.pool.begin().await?;

        // Serialize writers of the same stream for the duration of the
        // transaction; other streams are unaffected.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(stream_id.to_string())
            .execute(&mut *tx)
            .await?;

        let actual: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM events WHERE stream_id = $1")
                .bind(stream_id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;
        let actual = Version::new(actual);

        if actual != expected_version {
            metrics::counter!("concurrency_conflicts_total").increment(1);
            return Err(EventStoreError::ConcurrencyConflict {
                stream_id,
                expected: expected_version,
                actual,
            });
        }

        match Self::insert_events(
            &mut *tx,
            stream_id,
            expected_version,
            events,
            metadata_json.as_ref(),
        )
        .await
        {
            Ok(version) => {
                tx.commit().await?;
                metrics::counter!("events_appended_total").increment(appended as u64);
                Ok(version)
            }
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                metrics::counter!("concurrency_conflicts_total").increment(1);
                let actual = self.stream_version(stream_id).await?;
                Err(EventStoreError::ConcurrencyConflict {
                    stream_id,
                    expected: expected_version,
                    actual,
                })
            }
            Err(e) => Err(EventStoreError::Database(e)),
        }
    }

    async fn stream_version(&self, stream_id: StreamId) -> Result<Version> {
        let version: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM events WHERE stream_id = $1")
                .bind(stream_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(Version::new(version))
    }

    async fn stream_ids(&self) -> Result<Vec<StreamId>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT stream_id
            FROM events
            GROUP BY stream_id
            ORDER BY MIN(sequence) ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(StreamId::from_uuid).collect())
    }
}

#[async_trait]
impl SnapshotStore for PostgresEventStore {
    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO snapshots (stream_id, version, payload, created_on_utc)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (stream_id, version) DO UPDATE SET
                payload = EXCLUDED.payload,
                created_on_utc = EXCLUDED.created_on_utc
            "#,
        )
        .bind(snapshot.stream_id.as_uuid())
        .bind(snapshot.version.as_i64())
        .bind(&snapshot.payload)
        .bind(snapshot.created_on_utc)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_latest_snapshot(&self, stream_id: StreamId) -> Result<Option<Snapshot>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT stream_id, version, payload, created_on_utc
            FROM snapshots
            WHERE stream_id = $1
            ORDER BY version DESC
            LIMIT 1
            "#,
        )
        .bind(stream_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Snapshot {
                stream_id: StreamId::from_uuid(row.try_get::<Uuid, _>("stream_id")?),
                version: Version::new(row.try_get("version")?),
                payload: row.try_get("payload")?,
                created_on_utc: row.try_get::<DateTime<Utc>, _>("created_on_utc")?,
            })),
            None => Ok(None),
        }
    }
}
