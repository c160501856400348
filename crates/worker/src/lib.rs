//! Background worker: wires the stores to the order summary projector and
//! runs it until shutdown.

pub mod config;
pub mod error;
pub mod telemetry;

use std::future::Future;
use std::time::Duration;

use event_store::{EventStore, InMemoryEventStore, PostgresEventStore};
use projections::{
    InMemoryOrderSummaryStore, OrderProjector, OrderSummaryStore, PostgresOrderSummaryStore,
};
use sqlx::postgres::PgPoolOptions;

pub use config::{Config, ConfigError, LogFormat};
pub use error::WorkerError;

/// Selects the stores described by `config` and runs the projector until
/// `shutdown` resolves.
///
/// Without a database URL both the event log and the summaries live in
/// memory, which is only useful for local runs.
pub async fn run<F>(config: &Config, shutdown: F) -> Result<(), WorkerError>
where
    F: Future<Output = ()>,
{
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await?;

            let store = PostgresEventStore::new(pool.clone());
            store.run_migrations().await?;
            tracing::info!("migrations applied");

            let sink = PostgresOrderSummaryStore::new(pool);
            run_projector(store, sink, config.projector_interval, shutdown).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            run_projector(
                InMemoryEventStore::new(),
                InMemoryOrderSummaryStore::new(),
                config.projector_interval,
                shutdown,
            )
            .await;
        }
    }

    Ok(())
}

async fn run_projector<S, D, F>(store: S, sink: D, interval: Duration, shutdown: F)
where
    S: EventStore + 'static,
    D: OrderSummaryStore + 'static,
    F: Future<Output = ()>,
{
    let handle = OrderProjector::new(store, sink)
        .with_interval(interval)
        .spawn();

    shutdown.await;
    tracing::info!("stopping projector");
    handle.shutdown().await;
}
