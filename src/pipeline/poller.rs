use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    clients::sqs::MessageQueue, metrics::RelayMetrics, models::message::QueueMessage,
    utils::Backoff,
};

/// Long-polls the queue and feeds received messages, in receipt order, into the handoff channel.
pub struct Poller {
    queue: Arc<dyn MessageQueue>,
    backoff: Backoff,
    metrics: Arc<RelayMetrics>,
}

impl Poller {
    pub fn new(queue: Arc<dyn MessageQueue>, backoff: Backoff, metrics: Arc<RelayMetrics>) -> Self {
        Self {
            queue,
            backoff,
            metrics,
        }
    }

    /// Runs until `cancel` fires or the consumer side of `tx` is dropped.
    pub async fn run(mut self, tx: mpsc::Sender<QueueMessage>, cancel: CancellationToken) {
        info!(queue_url = %self.queue.queue_url(), "Queue poller started");

        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                received = self.queue.receive() => received,
            };

            match received {
                Ok(messages) => {
                    self.backoff.reset();

                    for message in messages {
                        self.metrics.inc_received();
                        info!(message_id = %message.message_id, "Received message");

                        if tx.send(message).await.is_err() {
                            info!("Message consumer stopped, shutting down poller");
                            return;
                        }
                    }
                }
                Err(e) => {
                    self.metrics.inc_receive_error();
                    let delay = self.backoff.next_delay();

                    warn!(
                        error = %e,
                        attempt = self.backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "Receive from queue failed, backing off"
                    );

                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        info!("Queue poller stopped");
    }
}
