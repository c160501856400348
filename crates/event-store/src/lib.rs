//! Append-only event store for event-sourced aggregates.
//!
//! - [`EventEnvelope`] / [`EventData`] are the stored and appended units
//! - [`EventSerializer`] maps typed events to `(type tag, payload)` pairs
//! - [`EventStore`] is the storage contract, implemented by
//!   [`InMemoryEventStore`] and [`PostgresEventStore`]
//! - [`Snapshot`] / [`SnapshotStore`] define the snapshot contract

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod serializer;
pub mod snapshot;
pub mod store;

pub use common::StreamId;
pub use error::{EventStoreError, Result};
pub use event::{EventData, EventEnvelope, EventEnvelopeBuilder, Metadata, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use serializer::{DomainEvent, EventSerializer, JsonEventSerializer};
pub use snapshot::Snapshot;
pub use store::{EventStore, EventStoreExt, SnapshotStore};
