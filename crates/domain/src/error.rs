//! Domain error types.

use common::StreamId;
use event_store::EventStoreError;
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// The order aggregate rejected a command or could not replay its history.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Another aggregate type rejected a command.
    #[error("Command rejected: {0}")]
    Rejected(Box<dyn std::error::Error + Send + Sync>),

    /// Every attempt of a retried command hit a concurrency conflict.
    #[error("Command on stream {stream_id} gave up after {attempts} conflicting attempts")]
    RetriesExhausted { stream_id: StreamId, attempts: u32 },
}

impl DomainError {
    /// Returns true if the error is an optimistic concurrency conflict.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, DomainError::EventStore(e) if e.is_concurrency_conflict())
    }
}
