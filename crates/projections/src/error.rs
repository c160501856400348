//! Projection error types.

use common::StreamId;
use event_store::Version;
use thiserror::Error;

/// Errors that can occur during projection processing.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] event_store::EventStoreError),

    /// Failed to parse an event payload.
    #[error("Event deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A payload lacks a field the fold needs, or holds it with the wrong type.
    #[error("Event {version} of stream {stream_id} has no usable `{field}` field")]
    MissingField {
        stream_id: StreamId,
        version: Version,
        field: &'static str,
    },

    /// A line was recorded before the order was created.
    #[error("Event {version} of stream {stream_id} precedes the order's creation")]
    OrderNotCreated { stream_id: StreamId, version: Version },

    /// The order was created a second time.
    #[error("Event {version} of stream {stream_id} creates an order that already exists")]
    AlreadyCreated { stream_id: StreamId, version: Version },

    /// A line's currency differs from the order's.
    #[error("Stream {stream_id} mixes currencies: {expected} and {actual}")]
    CurrencyMismatch {
        stream_id: StreamId,
        expected: String,
        actual: String,
    },

    /// A line total overflowed.
    #[error("Stream {stream_id} total overflows")]
    AmountOverflow { stream_id: StreamId },

    /// The read model database failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
