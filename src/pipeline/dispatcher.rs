use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    clients::alertmanager::AlertmanagerClient,
    error::DeliveryError,
    metrics::RelayMetrics,
    models::{
        alert::Alert,
        message::{DeliveredMessage, QueueMessage},
    },
};

/// Sends one alert per message. Never retries; a failed message stays on the queue and comes
/// back after its visibility timeout.
pub struct Dispatcher {
    client: AlertmanagerClient,
    metrics: Arc<RelayMetrics>,
}

impl Dispatcher {
    pub fn new(client: AlertmanagerClient, metrics: Arc<RelayMetrics>) -> Self {
        Self { client, metrics }
    }

    pub async fn dispatch(
        &self,
        message: QueueMessage,
        alert: &Alert,
    ) -> Result<DeliveredMessage, DeliveryError> {
        match self.client.send_alerts(std::slice::from_ref(alert)).await {
            Ok(status) => {
                self.metrics.inc_delivered(&alert.labels.service);

                info!(
                    message_id = %message.message_id,
                    status,
                    service = %alert.labels.service,
                    alertname = %alert.labels.alertname,
                    "Alert delivered to alertmanager"
                );

                Ok(DeliveredMessage::confirm(message))
            }
            Err(e) => {
                self.metrics.inc_delivery_error();

                warn!(
                    message_id = %message.message_id,
                    error = %e,
                    "Alert delivery failed, leaving message on queue"
                );

                Err(e)
            }
        }
    }
}
