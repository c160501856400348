//! Aggregate trait and the event-sourced replay/mutation engine.

use common::StreamId;
use event_store::{DomainEvent, Version};

/// Trait for aggregates in an event-sourced system.
///
/// An aggregate's state is derived solely by folding its event history.
/// Implementors provide the fold ([`when`](Aggregate::when)); the
/// bookkeeping of versions and uncommitted events lives in [`EventSourced`].
pub trait Aggregate: Default + Clone + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate can produce.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's identity, or None before its creation event.
    fn id(&self) -> Option<StreamId>;

    /// Folds an event into the state.
    ///
    /// Must be deterministic and exhaustive over `Self::Event`. On error the
    /// state must be left untouched.
    fn when(&mut self, event: &Self::Event) -> Result<(), Self::Error>;
}

/// In-memory reconstruction of one stream.
///
/// Two phases:
/// - hydrating, via [`load_from_history`](Self::load_from_history): replay
///   only, nothing is recorded
/// - mutating, via [`apply`](Self::apply): each event is folded and recorded
///   as uncommitted
///
/// An instance belongs to a single command execution and is dropped once the
/// command completes.
pub struct EventSourced<A: Aggregate> {
    state: A,
    version: Version,
    uncommitted: Vec<A::Event>,
}

impl<A: Aggregate> EventSourced<A> {
    /// Creates an empty aggregate at version 0.
    pub fn new() -> Self {
        Self {
            state: A::default(),
            version: Version::initial(),
            uncommitted: Vec::new(),
        }
    }

    /// Creates an aggregate by replaying `history`.
    pub fn from_history(history: impl IntoIterator<Item = A::Event>) -> Result<Self, A::Error> {
        let mut aggregate = Self::new();
        aggregate.load_from_history(history)?;
        Ok(aggregate)
    }

    /// Replays past events. Each event bumps the version; nothing is
    /// recorded, and the uncommitted buffer is empty afterwards.
    pub fn load_from_history(
        &mut self,
        history: impl IntoIterator<Item = A::Event>,
    ) -> Result<(), A::Error> {
        for event in history {
            self.state.when(&event)?;
            self.version = self.version.next();
        }
        self.uncommitted.clear();
        Ok(())
    }

    /// Folds a new event into the state and records it as uncommitted.
    ///
    /// The event is recorded only if the fold accepted it.
    pub fn apply(&mut self, event: A::Event) -> Result<(), A::Error> {
        self.state.when(&event)?;
        self.uncommitted.push(event);
        self.version = self.version.next();
        Ok(())
    }

    /// Runs a command against the current state and applies the events it
    /// decides on. Returns the number of events applied.
    ///
    /// The batch is folded into a draft first; if any event is rejected,
    /// neither the state nor the buffer changes.
    pub fn execute<F>(&mut self, command: F) -> Result<usize, A::Error>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
    {
        let events = command(&self.state)?;

        let mut draft = self.state.clone();
        for event in &events {
            draft.when(event)?;
        }

        let count = events.len();
        self.state = draft;
        self.version = self.version.advance(count);
        self.uncommitted.extend(events);
        Ok(count)
    }

    /// Returns the current state.
    pub fn state(&self) -> &A {
        &self.state
    }

    /// Consumes the wrapper and returns the state.
    pub fn into_state(self) -> A {
        self.state
    }

    /// Returns the aggregate's identity.
    pub fn id(&self) -> Option<StreamId> {
        self.state.id()
    }

    /// Number of events applied so far, committed or not.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Version of the stream before the uncommitted events; this is the
    /// expected version to append with.
    pub fn original_version(&self) -> Version {
        Version::new(self.version.as_i64() - self.uncommitted.len() as i64)
    }

    /// Returns the events applied since the aggregate was loaded.
    pub fn uncommitted_events(&self) -> &[A::Event] {
        &self.uncommitted
    }

    /// Returns true if there are events waiting to be appended.
    pub fn has_uncommitted(&self) -> bool {
        !self.uncommitted.is_empty()
    }

    /// Drains the uncommitted buffer.
    ///
    /// The returned events are no longer tracked, so they cannot be submitted twice.
    pub fn take_uncommitted(&mut self) -> Vec<A::Event> {
        std::mem::take(&mut self.uncommitted)
    }

    /// Discards the uncommitted buffer without touching state or version.
    pub fn clear_uncommitted(&mut self) {
        self.uncommitted.clear();
    }
}

impl<A: Aggregate> Default for EventSourced<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> std::fmt::Debug for EventSourced<A>
where
    A: Aggregate + std::fmt::Debug,
    A::Event: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSourced")
            .field("state", &self.state)
            .field("version", &self.version)
            .field("uncommitted", &self.uncommitted)
            .finish()
    }
}
