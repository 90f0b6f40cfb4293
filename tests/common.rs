use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
    time::Duration,
};

use alert_relay::{clients::sqs::MessageQueue, config::Config, error::QueueError, models::message::QueueMessage};
use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

pub const QUEUE_URL: &str = "http://localhost:4100/queue/alerts1";

pub const ALERT_PATTERN: &str =
    r"alert-(?P<env>\w+)-(?P<service>\w+)-(?P<appversion>\d+\-\d+\-\d+\-\d+)-(?P<alarmname>.*)$";

/// Queue double: serves scripted receive results and records deletes.
pub struct InMemoryQueue {
    batches: Mutex<VecDeque<Result<Vec<QueueMessage>, String>>>,
    deleted: Mutex<Vec<String>>,
    fail_deletes: AtomicBool,
    receive_calls: AtomicU32,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self {
            batches: Mutex::new(VecDeque::new()),
            deleted: Mutex::new(Vec::new()),
            fail_deletes: AtomicBool::new(false),
            receive_calls: AtomicU32::new(0),
        }
    }

    pub fn with_batches(batches: Vec<Result<Vec<QueueMessage>, String>>) -> Self {
        let queue = Self::new();
        queue.batches.lock().unwrap().extend(batches);
        queue
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn receive_calls(&self) -> u32 {
        self.receive_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn receive(&self) -> Result<Vec<QueueMessage>, QueueError> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);

        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(Ok(messages)) => Ok(messages),
            Some(Err(e)) => Err(QueueError::Receive(e)),
            None => {
                // an empty long poll
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(QueueError::Delete("access denied".to_string()));
        }

        self.deleted.lock().unwrap().push(receipt_handle.to_string());
        Ok(())
    }

    fn queue_url(&self) -> &str {
        QUEUE_URL
    }
}

pub fn test_config(alertmanager_url: &str) -> Config {
    Config {
        alertmanager_url: alertmanager_url.to_string(),
        alert_regex: ALERT_PATTERN.to_string(),
        alertmanager_timeout_seconds: 2,
        ..Config::default()
    }
}

pub fn alarm_json(alarm_name: &str) -> serde_json::Value {
    json!({
        "AWSAccountId": "123456789012",
        "AlarmDescription": "CPU above 90% for 5 minutes",
        "AlarmName": alarm_name,
        "NewStateReason": "Threshold Crossed: 1 datapoint [95.0] was greater than the threshold (90.0).",
        "NewStateValue": "ALARM",
        "OldStateValue": "OK",
        "Region": "EU (Ireland)",
        "StateChangeTime": "2026-10-19T08:15:00.000+0000",
        "Trigger": {
            "MetricName": "CPUUtilization",
            "Namespace": "AWS/EC2",
            "Dimensions": [
                { "name": "AutoScalingGroupName", "value": "billing-asg-blue" }
            ]
        }
    })
}

/// Wraps an alarm the way the notification topic does: the alarm travels as a JSON string.
pub fn envelope_body(alarm: &serde_json::Value) -> String {
    json!({
        "Type": "Notification",
        "MessageId": Uuid::new_v4().to_string(),
        "TopicArn": "arn:aws:sns:eu-west-1:123456789012:alarms",
        "Subject": "ALARM",
        "Message": alarm.to_string(),
        "Timestamp": "2026-10-19T08:15:01.000Z"
    })
    .to_string()
}

pub fn queue_message(id: &str, body: String) -> QueueMessage {
    QueueMessage {
        message_id: id.to_string(),
        receipt_handle: format!("receipt-{}", id),
        body,
    }
}
