use async_trait::async_trait;

use crate::{
    DomainEvent, EventData, EventEnvelope, EventSerializer, Metadata, Result, Snapshot, StreamId,
    Version,
};

/// Core trait for event store implementations.
///
/// An event store is an append-only log of events grouped into streams.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Reads every event of a stream in ascending version order.
    ///
    /// A stream that was never written yields an empty list.
    async fn read_stream(&self, stream_id: StreamId) -> Result<Vec<EventEnvelope>>;

    /// Reads the events of a stream starting at `from_version` (inclusive).
    ///
    /// Useful when replaying after a snapshot.
    async fn read_stream_from(
        &self,
        stream_id: StreamId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>>;

    /// Appends events to a stream.
    ///
    /// The version check and the write form one atomic unit: if the stream is
    /// not at `expected_version` the call fails with `ConcurrencyConflict`
    /// and nothing is written. Otherwise the events receive the versions
    /// `expected_version + 1 ..` in input order and are persisted
    /// all-or-nothing.
    ///
    /// Returns the new version of the stream.
    async fn append_to_stream(
        &self,
        stream_id: StreamId,
        expected_version: Version,
        events: Vec<EventData>,
        metadata: Option<Metadata>,
    ) -> Result<Version>;

    /// Gets the current version of a stream (0 if it has no events).
    async fn stream_version(&self, stream_id: StreamId) -> Result<Version>;

    /// Lists every distinct stream in the log, in order of first append.
    async fn stream_ids(&self) -> Result<Vec<StreamId>>;
}

/// Storage contract for aggregate snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Saves a snapshot. A snapshot with the same `(stream_id, version)` is replaced.
    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()>;

    /// Retrieves the snapshot with the highest version for a stream.
    async fn load_latest_snapshot(&self, stream_id: StreamId) -> Result<Option<Snapshot>>;
}

/// Extension trait providing typed access on top of any event store.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Serializes typed events and appends them to a stream.
    async fn append_events<E, Z>(
        &self,
        serializer: &Z,
        stream_id: StreamId,
        expected_version: Version,
        events: &[E],
        metadata: Option<Metadata>,
    ) -> Result<Version>
    where
        E: DomainEvent,
        Z: EventSerializer,
    {
        let data = events
            .iter()
            .map(|event| serializer.serialize(event))
            .collect::<Result<Vec<_>>>()?;

        self.append_to_stream(stream_id, expected_version, data, metadata)
            .await
    }

    /// Reads a stream and deserializes every event.
    ///
    /// Fails on the first event whose type tag cannot be resolved; the
    /// history is never returned with gaps.
    async fn read_events<E, Z>(&self, serializer: &Z, stream_id: StreamId) -> Result<Vec<E>>
    where
        E: DomainEvent,
        Z: EventSerializer,
    {
        self.read_stream(stream_id)
            .await?
            .iter()
            .map(|envelope| serializer.deserialize(&envelope.event_type, &envelope.payload))
            .collect()
    }

    /// Checks if a stream exists (has any events).
    async fn stream_exists(&self, stream_id: StreamId) -> Result<bool> {
        Ok(self.stream_version(stream_id).await? > Version::initial())
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}
