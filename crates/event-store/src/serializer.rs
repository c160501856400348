//! Conversion between typed domain events and stored `(type tag, payload)` pairs.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{EventData, EventStoreError, Result};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
///
/// Implementors are enums serialized adjacently tagged
/// (`#[serde(tag = "type", content = "data")]`) whose variants are renamed to
/// their stable type tags, so that `event_type()` and the serde tag agree.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the stable type tag of this event.
    fn event_type(&self) -> &'static str;

    /// Returns every type tag this event type can resolve.
    fn event_types() -> &'static [&'static str];
}

/// Converts typed events to stored form and back.
pub trait EventSerializer: Send + Sync {
    /// Serializes an event into its type tag and payload bytes.
    fn serialize<E: DomainEvent>(&self, event: &E) -> Result<EventData>;

    /// Deserializes payload bytes stored under `event_type`.
    ///
    /// Fails with [`EventStoreError::UnknownEventType`] if the tag does not
    /// belong to `E`.
    fn deserialize<E: DomainEvent>(&self, event_type: &str, payload: &[u8]) -> Result<E>;
}

/// JSON serializer with permissive field matching on read.
///
/// Unknown fields are ignored, and camelCase or PascalCase keys written by
/// other producers are matched against the snake_case payload fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEventSerializer;

impl JsonEventSerializer {
    /// Creates a new JSON serializer.
    pub fn new() -> Self {
        Self
    }
}

impl EventSerializer for JsonEventSerializer {
    fn serialize<E: DomainEvent>(&self, event: &E) -> Result<EventData> {
        let event_type = event.event_type();
        let tagged = serde_json::to_value(event)?;

        let payload = match tagged {
            Value::Object(mut fields) => fields.remove("data").unwrap_or(Value::Null),
            _ => {
                return Err(EventStoreError::Serialization(
                    <serde_json::Error as serde::ser::Error>::custom(format!(
                        "event {event_type} must serialize as an adjacently tagged object"
                    )),
                ));
            }
        };

        Ok(EventData {
            event_type: event_type.to_string(),
            payload: serde_json::to_vec(&payload)?,
        })
    }

    fn deserialize<E: DomainEvent>(&self, event_type: &str, payload: &[u8]) -> Result<E> {
        if !E::event_types().contains(&event_type) {
            return Err(EventStoreError::UnknownEventType {
                event_type: event_type.to_string(),
            });
        }

        let data: Value = serde_json::from_slice(payload)?;

        let mut tagged = Map::with_capacity(2);
        tagged.insert("type".to_string(), Value::String(event_type.to_string()));
        tagged.insert("data".to_string(), normalize_keys(data));

        Ok(serde_json::from_value(Value::Object(tagged))?)
    }
}

/// Rewrites the payload's top-level field names to snake_case.
///
/// Nested values are data and are left as stored, so map keys survive. A key
/// already in snake_case wins over a differently cased duplicate.
fn normalize_keys(value: Value) -> Value {
    let Value::Object(fields) = value else {
        return value;
    };

    let mut normalized = Map::with_capacity(fields.len());
    let mut renamed = Vec::new();
    for (key, value) in fields {
        let snake = to_snake_case(&key);
        if snake == key {
            normalized.insert(key, value);
        } else {
            renamed.push((snake, value));
        }
    }
    for (key, value) in renamed {
        normalized.entry(key).or_insert(value);
    }

    Value::Object(normalized)
}

/// `CustomerId` / `customerId` / `customer_id` -> `customer_id`, `OrderID` -> `order_id`.
fn to_snake_case(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}
