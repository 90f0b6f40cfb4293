use std::fmt::{Display, Formatter, Result};

/// A message received from the source queue. The receipt handle proves ownership and is
/// required to delete it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
}

/// Proof that the alerting backend accepted the alert built from `message`.
///
/// Only the dispatcher can construct one, so the acknowledger can never be handed a message
/// whose alert was not confirmed.
#[derive(Debug)]
pub struct DeliveredMessage {
    message: QueueMessage,
}

impl DeliveredMessage {
    pub(crate) fn confirm(message: QueueMessage) -> Self {
        Self { message }
    }

    pub fn message(&self) -> &QueueMessage {
        &self.message
    }

    pub fn into_message(self) -> QueueMessage {
        self.message
    }
}

/// Terminal state of a single pass of a message through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Body could not be parsed; left on the queue.
    Rejected,
    /// Backend refused the alert or was unreachable; left on the queue.
    DeliveryFailed,
    /// Delivered and deleted.
    Acknowledged,
    /// Delivered, but the delete call failed; the queue may redeliver it.
    AckFailed,
}

impl MessageOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, MessageOutcome::Acknowledged)
    }
}

impl Display for MessageOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            MessageOutcome::Rejected => write!(f, "rejected"),
            MessageOutcome::DeliveryFailed => write!(f, "delivery_failed"),
            MessageOutcome::Acknowledged => write!(f, "acknowledged"),
            MessageOutcome::AckFailed => write!(f, "ack_failed"),
        }
    }
}
