use thiserror::Error;

/// Errors turning a queue message body into an alert.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("invalid alarm envelope: {0}")]
    InvalidEnvelope(String),
    #[error("invalid alarm payload: {0}")]
    InvalidAlarm(String),
}

/// Errors posting an alert to the alerting backend.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("failed to encode alerts: {0}")]
    Encode(String),
    #[error("request to alertmanager failed: {0}")]
    Transport(String),
    #[error("alertmanager rejected alert with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Errors talking to the source queue.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("failed to receive messages: {0}")]
    Receive(String),
    #[error("failed to delete message: {0}")]
    Delete(String),
}
