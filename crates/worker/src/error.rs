//! Worker error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that stop the worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Event store error: {0}")]
    EventStore(#[from] event_store::EventStoreError),

    #[error("Metrics exporter error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("Tracing setup error: {0}")]
    Tracing(#[from] tracing_subscriber::util::TryInitError),
}
