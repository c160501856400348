use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::StreamId;

/// String-keyed side channel stored next to each event
/// (correlation ids, causation ids, user agent, ...).
pub type Metadata = HashMap<String, String>;

/// Position of an event within its stream, used for optimistic concurrency control.
///
/// Versions start at 1 for the first event and increment by 1 for each
/// subsequent event on a stream. Version 0 denotes a stream with no events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) of a stream that was never written.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the first version (1) for the first event.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns this version advanced by `count` events.
    pub fn advance(&self, count: usize) -> Self {
        Self(self.0 + count as i64)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// A serialized event waiting to be appended to a stream.
///
/// The store assigns the version and timestamp at append time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventData {
    /// Serializer-resolvable type tag.
    pub event_type: String,

    /// Serialized event body.
    pub payload: Vec<u8>,
}

impl EventData {
    /// Creates event data from a type tag and raw payload bytes.
    pub fn new(event_type: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: payload.into(),
        }
    }

    /// Creates event data by serializing `payload` to JSON.
    pub fn json<T: Serialize>(
        event_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event_type: event_type.into(),
            payload: serde_json::to_vec(payload)?,
        })
    }
}

/// A stored event together with its position in the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// The stream (aggregate instance) this event belongs to.
    pub stream_id: StreamId,

    /// 1-based position of this event within its stream.
    pub version: Version,

    /// The type tag of the event (e.g. `"sales.orders.OrderCreated"`).
    pub event_type: String,

    /// The serialized event body.
    pub payload: Vec<u8>,

    /// When the event was recorded by the store.
    pub occurred_on_utc: DateTime<Utc>,

    /// Optional side-channel metadata.
    pub metadata: Option<Metadata>,
}

impl EventEnvelope {
    /// Creates a new event envelope builder.
    pub fn builder() -> EventEnvelopeBuilder {
        EventEnvelopeBuilder::default()
    }

    /// Parses the payload as a JSON document.
    pub fn payload_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// Builder for constructing event envelopes.
#[derive(Debug, Default)]
pub struct EventEnvelopeBuilder {
    stream_id: Option<StreamId>,
    version: Option<Version>,
    event_type: Option<String>,
    payload: Option<Vec<u8>>,
    occurred_on_utc: Option<DateTime<Utc>>,
    metadata: Option<Metadata>,
}

impl EventEnvelopeBuilder {
    /// Sets the stream ID.
    pub fn stream_id(mut self, id: StreamId) -> Self {
        self.stream_id = Some(id);
        self
    }

    /// Sets the version.
    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Sets the event type.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_vec(payload)?);
        Ok(self)
    }

    /// Sets the payload from raw bytes.
    pub fn payload_raw(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Sets the timestamp. If not set, the current time will be used.
    pub fn occurred_on_utc(mut self, timestamp: DateTime<Utc>) -> Self {
        self.occurred_on_utc = Some(timestamp);
        self
    }

    /// Adds a metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Builds the envelope, or `None` if stream id, version, type or payload
    /// is missing. The timestamp defaults to now.
    pub fn try_build(self) -> Option<EventEnvelope> {
        Some(EventEnvelope {
            stream_id: self.stream_id?,
            version: self.version?,
            event_type: self.event_type?,
            payload: self.payload?,
            occurred_on_utc: self.occurred_on_utc.unwrap_or_else(Utc::now),
            metadata: self.metadata,
        })
    }
}
