use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    EventData, EventEnvelope, EventStoreError, Metadata, Result, Snapshot, StreamId, Version,
    store::{EventStore, SnapshotStore},
};

/// In-memory event store implementation.
///
/// Events live in a single global log whose index is the storage sequence.
/// The version check and the insert of an append run under one write guard,
/// which makes the compare-and-append atomic.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<EventEnvelope>>>,
    snapshots: Arc<RwLock<BTreeMap<(StreamId, Version), Snapshot>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Clears all events and snapshots.
    pub async fn clear(&self) {
        self.events.write().await.clear();
        self.snapshots.write().await.clear();
    }

    fn current_version(log: &[EventEnvelope], stream_id: StreamId) -> Version {
        log.iter()
            .filter(|e| e.stream_id == stream_id)
            .map(|e| e.version)
            .max()
            .unwrap_or(Version::initial())
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn read_stream(&self, stream_id: StreamId) -> Result<Vec<EventEnvelope>> {
        self.read_stream_from(stream_id, Version::first()).await
    }

    async fn read_stream_from(
        &self,
        stream_id: StreamId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let log = self.events.read().await;
        let mut events: Vec<_> = log
            .iter()
            .filter(|e| e.stream_id == stream_id && e.version >= from_version)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    #[tracing::instrument(skip(self, events, metadata), fields(event_count = events.len()))]
    async fn append_to_stream(
        &self,
        stream_id: StreamId,
        expected_version: Version,
        events: Vec<EventData>,
        metadata: Option<Metadata>,
    ) -> Result<Version> {
        let mut log = self.events.write().await;

        let actual = Self::current_version(&log, stream_id);
        if actual != expected_version {
            metrics::counter!("concurrency_conflicts_total").increment(1);
            return Err(EventStoreError::ConcurrencyConflict {
                stream_id,
                expected: expected_version,
                actual,
            });
        }

        let occurred_on_utc = Utc::now();
        let appended = events.len();
        let mut version = expected_version;

        // Envelopes are built before touching the log so a failure cannot
        // leave a partial run behind.
        let envelopes: Vec<_> = events
            .into_iter()
            .map(|event| {
                version = version.next();
                EventEnvelope {
                    stream_id,
                    version,
                    event_type: event.event_type,
                    payload: event.payload,
                    occurred_on_utc,
                    metadata: metadata.clone(),
                }
            })
            .collect();

        log.extend(envelopes);
        metrics::counter!("events_appended_total").increment(appended as u64);

        Ok(version)
    }

    async fn stream_version(&self, stream_id: StreamId) -> Result<Version> {
        let log = self.events.read().await;
        Ok(Self::current_version(&log, stream_id))
    }

    async fn stream_ids(&self) -> Result<Vec<StreamId>> {
        let log = self.events.read().await;
        let mut ids = Vec::new();
        for event in log.iter() {
            if !ids.contains(&event.stream_id) {
                ids.push(event.stream_id);
            }
        }
        Ok(ids)
    }
}

#[async_trait]
impl SnapshotStore for InMemoryEventStore {
    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.insert((snapshot.stream_id, snapshot.version), snapshot);
        Ok(())
    }

    async fn load_latest_snapshot(&self, stream_id: StreamId) -> Result<Option<Snapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots
            .range((stream_id, Version::initial())..=(stream_id, Version::new(i64::MAX)))
            .next_back()
            .map(|(_, snapshot)| snapshot.clone()))
    }
}
