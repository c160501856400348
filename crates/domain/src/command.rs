//! Command handling infrastructure.

use std::marker::PhantomData;
use std::time::Duration;

use common::StreamId;
use event_store::{
    EventSerializer, EventStore, EventStoreExt, JsonEventSerializer, Metadata, Version,
};

use crate::aggregate::{Aggregate, EventSourced};
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    /// The new version of the stream after the command.
    pub new_version: Version,
}

/// Trait for commands that can be executed against an aggregate.
///
/// Commands represent an intention to perform an action. They may be rejected
/// if the aggregate's current state doesn't allow the action.
pub trait Command: Send + Sync {
    /// The type of aggregate this command targets.
    type Aggregate: Aggregate;

    /// Returns the stream the command targets.
    fn stream_id(&self) -> StreamId;
}

/// How often and how patiently a conflicting command is re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,

    /// Delay before the second attempt; grows linearly with each retry.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(10),
        }
    }
}

/// Handler for executing commands against aggregates.
///
/// The handler is responsible for:
/// 1. Hydrating the aggregate from its stream
/// 2. Running the command to decide on new events
/// 3. Appending those events with the version it loaded as expected version
///
/// Conflicts are surfaced to the caller unless the command is run through
/// [`execute_with_retry`](Self::execute_with_retry).
pub struct CommandHandler<S, A, Z = JsonEventSerializer>
where
    S: EventStore,
    A: Aggregate,
    Z: EventSerializer,
{
    store: S,
    serializer: Z,
    retry: RetryPolicy,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    /// Creates a new command handler with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            serializer: JsonEventSerializer,
            retry: RetryPolicy::default(),
            _phantom: PhantomData,
        }
    }
}

impl<S, A, Z> CommandHandler<S, A, Z>
where
    S: EventStore,
    A: Aggregate,
    Z: EventSerializer,
    DomainError: From<A::Error>,
{
    /// Creates a command handler with a custom serializer.
    pub fn with_serializer(store: S, serializer: Z) -> Self {
        Self {
            store,
            serializer,
            retry: RetryPolicy::default(),
            _phantom: PhantomData,
        }
    }

    /// Replaces the retry policy used by [`execute_with_retry`](Self::execute_with_retry).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the serializer used for reading and writing events.
    pub fn serializer(&self) -> &Z {
        &self.serializer
    }

    /// Hydrates an aggregate from its stream.
    ///
    /// A stream without events yields an empty aggregate at version 0. An
    /// event with an unresolvable tag aborts hydration.
    pub async fn load(&self, stream_id: StreamId) -> Result<EventSourced<A>, DomainError> {
        let history = self
            .store
            .read_events::<A::Event, Z>(&self.serializer, stream_id)
            .await?;

        Ok(EventSourced::from_history(history)?)
    }

    /// Loads an aggregate, returning None if its stream has no events.
    pub async fn load_existing(
        &self,
        stream_id: StreamId,
    ) -> Result<Option<EventSourced<A>>, DomainError> {
        let aggregate = self.load(stream_id).await?;
        if aggregate.version() > Version::initial() {
            Ok(Some(aggregate))
        } else {
            Ok(None)
        }
    }

    /// Appends the aggregate's uncommitted events, expecting the stream to
    /// still be at the version it was loaded at.
    ///
    /// The events are drained from the aggregate before the append; on
    /// failure the aggregate must be discarded and reloaded.
    pub async fn save(
        &self,
        stream_id: StreamId,
        aggregate: &mut EventSourced<A>,
        metadata: Option<Metadata>,
    ) -> Result<(Version, Vec<A::Event>), DomainError> {
        let expected = aggregate.original_version();
        let events = aggregate.take_uncommitted();

        if events.is_empty() {
            return Ok((expected, events));
        }

        let new_version = self
            .store
            .append_events(&self.serializer, stream_id, expected, &events, metadata)
            .await?;

        Ok((new_version, events))
    }

    /// Executes a command and persists the resulting events.
    ///
    /// The command function receives the current aggregate state and returns
    /// either a list of events to apply, or an error. A rejected command
    /// appends nothing.
    pub async fn execute<F>(
        &self,
        stream_id: StreamId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
    {
        self.execute_with_metadata(stream_id, None, command_fn)
            .await
    }

    /// Like [`execute`](Self::execute), attaching `metadata` to every
    /// appended event.
    #[tracing::instrument(
        skip(self, metadata, command_fn),
        fields(aggregate = A::aggregate_type())
    )]
    pub async fn execute_with_metadata<F>(
        &self,
        stream_id: StreamId,
        metadata: Option<Metadata>,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
    {
        let mut aggregate = self.load(stream_id).await?;
        aggregate.execute(command_fn)?;

        let (new_version, events) = self.save(stream_id, &mut aggregate, metadata).await?;

        metrics::counter!("commands_executed_total", "aggregate" => A::aggregate_type())
            .increment(1);
        tracing::debug!(
            events = events.len(),
            new_version = new_version.as_i64(),
            "command executed"
        );

        Ok(CommandResult {
            aggregate: aggregate.into_state(),
            events,
            new_version,
        })
    }

    /// Executes a command, reloading and re-running it when the append hits
    /// a concurrency conflict.
    ///
    /// The command is re-decided against fresh state on every attempt, so it
    /// must be free of side effects. Gives up with
    /// [`DomainError::RetriesExhausted`] once the policy's attempts are spent.
    pub async fn execute_with_retry<F>(
        &self,
        stream_id: StreamId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
    {
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.execute(stream_id, &command_fn).await {
                Err(e) if e.is_concurrency_conflict() => {
                    metrics::counter!("command_retries_total", "aggregate" => A::aggregate_type())
                        .increment(1);
                    tracing::warn!(%stream_id, attempt, "concurrency conflict, retrying command");

                    if attempt < max_attempts {
                        tokio::time::sleep(self.retry.backoff * attempt).await;
                    }
                }
                other => return other,
            }
        }

        Err(DomainError::RetriesExhausted {
            stream_id,
            attempts: max_attempts,
        })
    }
}
