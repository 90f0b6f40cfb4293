use anyhow::{Error, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, timeout::TimeoutConfig};
use aws_sdk_sqs::{Client, config::Region, error::DisplayErrorContext};
use tracing::{info, warn};

use crate::{config::Config, error::QueueError, models::message::QueueMessage};

const LOCAL_ENDPOINT_REGION: &str = "us-east-1";

/// The source queue. One instance is shared by the poller and the acknowledger.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Long-polls for the next batch of messages.
    async fn receive(&self) -> Result<Vec<QueueMessage>, QueueError>;

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError>;

    fn queue_url(&self) -> &str;
}

pub struct SqsQueue {
    client: Client,
    queue_url: String,
    max_messages: i32,
    wait_time_seconds: i32,
    visibility_timeout_seconds: i32,
}

impl SqsQueue {
    pub async fn connect(config: &Config) -> Result<Self, Error> {
        info!(queue_url = %config.sqs_queue_url, "Connecting to SQS...");

        let timeouts = TimeoutConfig::builder()
            .operation_timeout(config.queue_timeout())
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(timeouts);

        if let Some(endpoint) = &config.aws_endpoint {
            info!(endpoint = %endpoint, "Using custom SQS endpoint");
            loader = loader
                .endpoint_url(endpoint)
                .region(Region::new(LOCAL_ENDPOINT_REGION));
        }

        if let Some(region) = &config.aws_region {
            loader = loader.region(Region::new(region.clone()));
        }

        let sdk_config = loader.load().await;

        info!("SQS client created");

        Ok(Self::from_client(Client::new(&sdk_config), config))
    }

    /// Wraps an already configured SDK client with the receive settings from `config`.
    pub fn from_client(client: Client, config: &Config) -> Self {
        Self {
            client,
            queue_url: config.sqs_queue_url.clone(),
            max_messages: config.sqs_max_messages,
            wait_time_seconds: config.sqs_wait_time_seconds,
            visibility_timeout_seconds: config.sqs_visibility_timeout_seconds,
        }
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn receive(&self) -> Result<Vec<QueueMessage>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(self.max_messages)
            .wait_time_seconds(self.wait_time_seconds)
            .visibility_timeout(self.visibility_timeout_seconds)
            .send()
            .await
            .map_err(|e| QueueError::Receive(DisplayErrorContext(&e).to_string()))?;

        let messages = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|message| {
                let message_id = message.message_id.unwrap_or_default();
                match message.receipt_handle {
                    Some(receipt_handle) => Some(QueueMessage {
                        message_id,
                        receipt_handle,
                        body: message.body.unwrap_or_default(),
                    }),
                    None => {
                        warn!(message_id = %message_id, "Dropping message without receipt handle");
                        None
                    }
                }
            })
            .collect();

        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::Delete(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }

    fn queue_url(&self) -> &str {
        &self.queue_url
    }
}
