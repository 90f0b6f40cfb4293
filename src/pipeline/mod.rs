//! Queue to Alertmanager delivery pipeline.
//!
//! One task runs the [`Poller`], pushing messages into a bounded channel. The consumption
//! loop in [`Relay::run`] takes one message at a time and drives it through transform,
//! dispatch and acknowledge before pulling the next one. Dispatch and acknowledge run as two
//! concurrent stages joined by a one-shot handoff that only ever carries a
//! [`DeliveredMessage`], so a delete can only follow a confirmed delivery.

pub mod acknowledger;
pub mod dispatcher;
pub mod poller;
pub mod transformer;

use std::sync::Arc;

use anyhow::{Error, Result};
use regex::Regex;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    clients::{alertmanager::AlertmanagerClient, sqs::MessageQueue},
    config::Config,
    metrics::RelayMetrics,
    models::message::{DeliveredMessage, MessageOutcome, QueueMessage},
};

pub use acknowledger::Acknowledger;
pub use dispatcher::Dispatcher;
pub use poller::Poller;
pub use transformer::AlertTransformer;

pub struct Relay {
    transformer: AlertTransformer,
    dispatcher: Dispatcher,
    acknowledger: Acknowledger,
    metrics: Arc<RelayMetrics>,
}

impl Relay {
    pub fn new(
        config: &Config,
        pattern: Regex,
        queue: Arc<dyn MessageQueue>,
        metrics: Arc<RelayMetrics>,
    ) -> Result<Self, Error> {
        let transformer =
            AlertTransformer::new(pattern, queue.queue_url()).with_metrics(Arc::clone(&metrics));
        let dispatcher = Dispatcher::new(AlertmanagerClient::new(config)?, Arc::clone(&metrics));
        let acknowledger = Acknowledger::new(queue, Arc::clone(&metrics));

        Ok(Self {
            transformer,
            dispatcher,
            acknowledger,
            metrics,
        })
    }

    /// Drives a single message to a terminal state.
    pub async fn process(&self, message: QueueMessage) -> MessageOutcome {
        let alert = match self.transformer.transform(&message.body) {
            Ok(alert) => alert,
            Err(e) => {
                self.metrics.inc_parse_error();
                warn!(
                    message_id = %message.message_id,
                    error = %e,
                    "Skipping unparseable message"
                );
                return MessageOutcome::Rejected;
            }
        };

        let (handoff_tx, handoff_rx) = oneshot::channel::<DeliveredMessage>();

        let send = async {
            if let Ok(delivered) = self.dispatcher.dispatch(message, &alert).await {
                info!(message_id = %delivered.message().message_id, "Processed message");
                let _ = handoff_tx.send(delivered);
            }
        };

        let acknowledge = async {
            match handoff_rx.await {
                Ok(delivered) => self.acknowledger.acknowledge(delivered).await,
                Err(_) => MessageOutcome::DeliveryFailed,
            }
        };

        let ((), outcome) = tokio::join!(send, acknowledge);
        outcome
    }

    /// Consumes messages until `cancel` fires or the poller goes away. A message already
    /// taken from the channel is always finished before returning.
    pub async fn run(&self, mut rx: mpsc::Receiver<QueueMessage>, cancel: CancellationToken) {
        info!("Message consumer started");

        loop {
            let message = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                message = rx.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            let message_id = message.message_id.clone();
            let outcome = self.process(message).await;

            info!(
                message_id = %message_id,
                outcome = %outcome,
                deleted = outcome.is_deleted(),
                "Message handled"
            );
        }

        info!("Message consumer stopped");
    }
}

/// Runs the poller and the consumption loop until `cancel` fires.
pub async fn run_pipeline(
    poller: Poller,
    relay: Relay,
    buffer_size: usize,
    cancel: CancellationToken,
) {
    let (tx, rx) = mpsc::channel(buffer_size);

    let poller_handle = tokio::spawn(poller.run(tx, cancel.clone()));

    relay.run(rx, cancel).await;

    if let Err(e) = poller_handle.await {
        warn!(error = %e, "Queue poller task failed");
    }
}
