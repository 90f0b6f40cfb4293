pub mod alertmanager;
pub mod health;
pub mod sqs;
