use std::{sync::Arc, time::Duration};

use alert_relay::{
    api::{AppState, run_api_server},
    clients::{
        health::HealthChecker,
        sqs::{MessageQueue, SqsQueue},
    },
    config::Config,
    metrics::{RelayMetrics, log_metrics_periodically},
    pipeline::{Poller, Relay, run_pipeline},
    utils::Backoff,
};
use anyhow::{Error, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;
    let pattern = config.compile_pattern()?;

    info!(
        queue_url = %config.sqs_queue_url,
        alertmanager_url = %config.alertmanager_url,
        "Configuration validated"
    );

    let metrics = Arc::new(RelayMetrics::new(&config.metric_prefix));
    let queue: Arc<dyn MessageQueue> = Arc::new(SqsQueue::connect(&config).await?);
    let cancel = CancellationToken::new();

    let listener = TcpListener::bind(config.listen_addr()?).await?;
    let state = Arc::new(AppState {
        health_checker: HealthChecker::new(&config)?,
        metrics: Arc::clone(&metrics),
    });
    let api_handle = tokio::spawn(run_api_server(listener, state, cancel.clone()));

    if let Some(interval) = config.metrics_log_interval_seconds {
        tokio::spawn(log_metrics_periodically(
            Arc::clone(&metrics),
            Duration::from_secs(interval),
            cancel.clone(),
        ));
    }

    let poller = Poller::new(
        Arc::clone(&queue),
        Backoff::new(config.backoff_config()),
        Arc::clone(&metrics),
    );
    let relay = Relay::new(&config, pattern, queue, Arc::clone(&metrics))?;

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Shutdown signal received");
        shutdown.cancel();
    });

    run_pipeline(poller, relay, config.buffer_size, cancel.clone()).await;

    cancel.cancel();
    match api_handle.await {
        Ok(Err(e)) => error!(error = %e, "Health check server failed"),
        Err(e) => error!(error = %e, "Health check server task failed"),
        Ok(Ok(())) => {}
    }

    info!("Relay stopped");

    Ok(())
}
