use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{StreamId, Version};

/// A materialized aggregate state at a specific stream version.
///
/// Snapshots are keyed by `(stream_id, version)` and are meant to let a
/// loader start replay after `version` instead of at the beginning of the
/// stream. Nothing in the write path produces or consumes them yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The stream this snapshot belongs to.
    pub stream_id: StreamId,

    /// The stream version the state reflects.
    pub version: Version,

    /// The serialized aggregate state.
    pub payload: Vec<u8>,

    /// When the snapshot was created.
    pub created_on_utc: DateTime<Utc>,
}

impl Snapshot {
    /// Creates a new snapshot from raw payload bytes.
    pub fn new(stream_id: StreamId, version: Version, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            stream_id,
            version,
            payload: payload.into(),
            created_on_utc: Utc::now(),
        }
    }

    /// Creates a snapshot from a serializable state.
    pub fn from_state<T: Serialize>(
        stream_id: StreamId,
        version: Version,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(stream_id, version, serde_json::to_vec(state)?))
    }

    /// Deserializes the snapshot payload into a concrete type.
    pub fn into_state<T: for<'de> Deserialize<'de>>(self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}
