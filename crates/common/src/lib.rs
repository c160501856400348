//! Shared types for the event-sourced orders core.

mod types;

pub use types::StreamId;
