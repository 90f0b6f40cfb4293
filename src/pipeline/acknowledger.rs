use std::sync::Arc;

use tracing::{error, info};

use crate::{
    clients::sqs::MessageQueue,
    metrics::RelayMetrics,
    models::message::{DeliveredMessage, MessageOutcome},
};

/// Deletes messages whose alerts were confirmed delivered.
pub struct Acknowledger {
    queue: Arc<dyn MessageQueue>,
    metrics: Arc<RelayMetrics>,
}

impl Acknowledger {
    pub fn new(queue: Arc<dyn MessageQueue>, metrics: Arc<RelayMetrics>) -> Self {
        Self { queue, metrics }
    }

    /// A failed delete is counted and logged but not retried; the queue will redeliver.
    pub async fn acknowledge(&self, delivered: DeliveredMessage) -> MessageOutcome {
        let message = delivered.into_message();

        match self.queue.delete(&message.receipt_handle).await {
            Ok(()) => {
                self.metrics.inc_deleted();
                info!(message_id = %message.message_id, "Deleted message from queue");
                MessageOutcome::Acknowledged
            }
            Err(e) => {
                self.metrics.inc_delete_error();
                error!(
                    message_id = %message.message_id,
                    error = %e,
                    "Failed to delete delivered message"
                );
                MessageOutcome::AckFailed
            }
        }
    }
}
