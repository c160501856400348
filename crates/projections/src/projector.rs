//! Periodic projector keeping order summaries up to date.

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::StreamId;
use event_store::EventStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::Result;
use crate::document::OrderSummary;
use crate::fold::project_order;
use crate::sink::OrderSummaryStore;

/// Default delay between two projection cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Outcome of one projection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionReport {
    /// Streams listed by the event store.
    pub streams_seen: usize,
    /// Streams whose summary was upserted.
    pub projected: usize,
    /// Streams that held no order.
    pub skipped: usize,
    /// Streams that could not be read, folded or written.
    pub failed: usize,
}

/// Rebuilds every order summary from the event log, once per interval.
///
/// Each cycle re-reads every stream in full and upserts the resulting
/// document, so rerunning over an unchanged log produces identical
/// documents. A stream that fails is logged and counted; it never stops the
/// cycle or the loop.
pub struct OrderProjector<S, D> {
    store: S,
    sink: D,
    interval: Duration,
}

impl<S, D> OrderProjector<S, D>
where
    S: EventStore,
    D: OrderSummaryStore,
{
    /// Creates a projector with the default interval.
    pub fn new(store: S, sink: D) -> Self {
        Self {
            store,
            sink,
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Sets the delay between cycles.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Returns the delay between cycles.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the summary store.
    pub fn sink(&self) -> &D {
        &self.sink
    }

    /// Runs one cycle over every stream in the log.
    ///
    /// Fails only if the list of streams cannot be read.
    pub async fn run_once(&self) -> Result<ProjectionReport> {
        self.cycle(None).await
    }

    /// Runs one cycle, stopping between streams once `shutdown` turns true.
    #[tracing::instrument(skip_all)]
    async fn cycle(&self, shutdown: Option<&watch::Receiver<bool>>) -> Result<ProjectionReport> {
        let started = Instant::now();
        let stream_ids = self.store.stream_ids().await?;

        let mut report = ProjectionReport {
            streams_seen: stream_ids.len(),
            ..ProjectionReport::default()
        };

        for stream_id in stream_ids {
            if shutdown.is_some_and(|rx| *rx.borrow()) {
                tracing::info!("shutdown requested, cycle cut short");
                break;
            }

            match self.project_stream(stream_id).await {
                Ok(Some(_)) => {
                    report.projected += 1;
                    metrics::counter!("projector_streams_projected_total").increment(1);
                }
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("projector_stream_failures_total").increment(1);
                    tracing::warn!(%stream_id, error = %e, "failed to project stream");
                }
            }
        }

        metrics::histogram!("projector_cycle_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(
            streams = report.streams_seen,
            projected = report.projected,
            skipped = report.skipped,
            failed = report.failed,
            "projection cycle complete"
        );

        Ok(report)
    }

    /// Folds a single stream and upserts its summary.
    pub async fn project_stream(&self, stream_id: StreamId) -> Result<Option<OrderSummary>> {
        let events = self.store.read_stream(stream_id).await?;

        match project_order(stream_id, &events)? {
            Some(summary) => {
                self.sink.upsert(summary.clone()).await?;
                Ok(Some(summary))
            }
            None => Ok(None),
        }
    }

    /// Runs cycles until `shutdown` turns true or its sender is dropped.
    ///
    /// The first cycle starts immediately. The signal is observed between
    /// cycles and between streams, never while a summary is being written.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "projector started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.cycle(Some(&shutdown)).await {
                        tracing::error!(error = %e, "projection cycle failed");
                    }
                }
            }
        }

        tracing::info!("projector stopped");
    }
}

impl<S, D> OrderProjector<S, D>
where
    S: EventStore + 'static,
    D: OrderSummaryStore + 'static,
{
    /// Starts the loop on a background task.
    pub fn spawn(self) -> ProjectorHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let projector = Arc::new(self);
        let task = tokio::spawn(async move { projector.run(shutdown_rx).await });

        ProjectorHandle { shutdown_tx, task }
    }
}

/// Handle to a projector started with [`OrderProjector::spawn`].
///
/// Dropping the handle also stops the loop, since the shutdown sender is
/// dropped with it.
pub struct ProjectorHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ProjectorHandle {
    /// Signals the loop to stop and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "projector task panicked");
        }
    }

    /// Returns true once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
