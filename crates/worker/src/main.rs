//! Worker entry point.

use std::process::ExitCode;

use tokio::signal;
use worker::{Config, WorkerError, telemetry};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn start() -> Result<(), WorkerError> {
    let config = Config::from_env()?;

    telemetry::init_tracing(config.log_format, &config.log_level)?;
    telemetry::init_metrics(config.metrics_addr)?;
    tracing::info!(
        metrics_addr = %config.metrics_addr,
        interval_secs = config.projector_interval.as_secs(),
        postgres = config.database_url.is_some(),
        "starting worker"
    );

    worker::run(&config, shutdown_signal()).await?;

    tracing::info!("worker shut down gracefully");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The subscriber may not be installed yet, so report on stderr too.
            eprintln!("worker failed: {e}");
            tracing::error!(error = %e, "worker failed");
            ExitCode::FAILURE
        }
    }
}
