pub mod alarm;
pub mod alert;
pub mod backoff;
pub mod health;
pub mod message;
