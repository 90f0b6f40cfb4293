use std::{sync::Arc, time::Duration};

use alert_relay::{
    clients::sqs::MessageQueue,
    metrics::RelayMetrics,
    models::{backoff::BackoffConfig, message::MessageOutcome},
    pipeline::{Poller, Relay, run_pipeline},
    utils::Backoff,
};
use anyhow::Result;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{InMemoryQueue, QUEUE_URL, alarm_json, envelope_body, queue_message, test_config};

const BILLING_ALARM: &str = "alert-prod-billing-1-2-3-4-high-cpu";

async fn mount_alertmanager(status: u16, expected_calls: u64) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/alerts"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected_calls)
        .mount(&mock_server)
        .await;

    mock_server
}

fn build_relay(
    alertmanager_url: &str,
    queue: Arc<InMemoryQueue>,
    metrics: Arc<RelayMetrics>,
) -> Result<Relay> {
    let config = test_config(alertmanager_url);
    let pattern = config.compile_pattern()?;
    let queue: Arc<dyn MessageQueue> = queue;

    Relay::new(&config, pattern, queue, metrics)
}

/// Test: An accepted alert deletes its message exactly once and bumps the success counters
#[tokio::test]
async fn test_delivered_message_is_deleted_once() -> Result<()> {
    let mock_server = mount_alertmanager(200, 1).await;
    let queue = Arc::new(InMemoryQueue::new());
    let metrics = Arc::new(RelayMetrics::new("sqs2alertmanager"));
    let relay = build_relay(&mock_server.uri(), Arc::clone(&queue), Arc::clone(&metrics))?;

    let message = queue_message("m-1", envelope_body(&alarm_json(BILLING_ALARM)));
    let outcome = relay.process(message).await;

    assert_eq!(outcome, MessageOutcome::Acknowledged);
    assert_eq!(queue.deleted(), vec!["receipt-m-1".to_string()]);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.alertmanager_ok, 1);
    assert_eq!(snapshot.alertmanager_err, 0);
    assert_eq!(snapshot.sqs_del_ok, 1);
    assert_eq!(metrics.delivered_for_service("billing"), 1);

    Ok(())
}

/// Test: The posted body is a one-element list holding the alert
#[tokio::test]
async fn test_posted_body_is_alert_list() -> Result<()> {
    let mock_server = mount_alertmanager(200, 1).await;
    let queue = Arc::new(InMemoryQueue::new());
    let metrics = Arc::new(RelayMetrics::new("sqs2alertmanager"));
    let relay = build_relay(&mock_server.uri(), Arc::clone(&queue), metrics)?;

    relay
        .process(queue_message("m-1", envelope_body(&alarm_json(BILLING_ALARM))))
        .await;

    let requests = mock_server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);

    let body: serde_json::Value = serde_json::from_slice(&requests[0].body)?;
    let alerts = body.as_array().expect("body should be a JSON array");

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["labels"]["env"], "prod");
    assert_eq!(alerts[0]["labels"]["service"], "billing");
    assert_eq!(alerts[0]["labels"]["alertname"], "high-cpu");
    assert_eq!(alerts[0]["labels"]["severity"], "Critical");
    assert_eq!(alerts[0]["annotations"]["SqsUrl"], QUEUE_URL);
    assert_eq!(alerts[0]["generatorURL"], "");

    Ok(())
}

/// Test: Any status below 400 counts as delivered
#[tokio::test]
async fn test_non_error_statuses_are_success() -> Result<()> {
    for status in [200, 202, 204] {
        let mock_server = mount_alertmanager(status, 1).await;
        let queue = Arc::new(InMemoryQueue::new());
        let metrics = Arc::new(RelayMetrics::new("sqs2alertmanager"));
        let relay = build_relay(&mock_server.uri(), Arc::clone(&queue), metrics)?;

        let outcome = relay
            .process(queue_message("m-1", envelope_body(&alarm_json(BILLING_ALARM))))
            .await;

        assert_eq!(outcome, MessageOutcome::Acknowledged, "status {}", status);
        assert_eq!(queue.deleted().len(), 1, "status {}", status);
    }

    Ok(())
}

/// Test: A 503 leaves the message on the queue and counts a failure
#[tokio::test]
async fn test_unavailable_backend_does_not_delete() -> Result<()> {
    let mock_server = mount_alertmanager(503, 1).await;
    let queue = Arc::new(InMemoryQueue::new());
    let metrics = Arc::new(RelayMetrics::new("sqs2alertmanager"));
    let relay = build_relay(&mock_server.uri(), Arc::clone(&queue), Arc::clone(&metrics))?;

    let outcome = relay
        .process(queue_message("m-1", envelope_body(&alarm_json(BILLING_ALARM))))
        .await;

    assert_eq!(outcome, MessageOutcome::DeliveryFailed);
    assert!(queue.deleted().is_empty());

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.alertmanager_err, 1);
    assert_eq!(snapshot.alertmanager_ok, 0);
    assert_eq!(snapshot.sqs_del_ok, 0);
    assert_eq!(metrics.delivered_for_service("billing"), 0);

    Ok(())
}

/// Test: Client errors are failures too, and are not retried in-process
#[tokio::test]
async fn test_client_error_is_not_retried() -> Result<()> {
    let mock_server = mount_alertmanager(400, 1).await;
    let queue = Arc::new(InMemoryQueue::new());
    let metrics = Arc::new(RelayMetrics::new("sqs2alertmanager"));
    let relay = build_relay(&mock_server.uri(), Arc::clone(&queue), Arc::clone(&metrics))?;

    let outcome = relay
        .process(queue_message("m-1", envelope_body(&alarm_json(BILLING_ALARM))))
        .await;

    assert_eq!(outcome, MessageOutcome::DeliveryFailed);
    assert!(queue.deleted().is_empty());
    assert_eq!(metrics.snapshot().alertmanager_err, 1);

    Ok(())
}

/// Test: An unreachable backend is a delivery failure, not a crash
#[tokio::test]
async fn test_unreachable_backend_does_not_delete() -> Result<()> {
    let queue = Arc::new(InMemoryQueue::new());
    let metrics = Arc::new(RelayMetrics::new("sqs2alertmanager"));
    let relay = build_relay("http://127.0.0.1:1", Arc::clone(&queue), Arc::clone(&metrics))?;

    let outcome = relay
        .process(queue_message("m-1", envelope_body(&alarm_json(BILLING_ALARM))))
        .await;

    assert_eq!(outcome, MessageOutcome::DeliveryFailed);
    assert!(queue.deleted().is_empty());
    assert_eq!(metrics.snapshot().alertmanager_err, 1);

    Ok(())
}

/// Test: Malformed bodies are skipped without contacting the backend or deleting
#[tokio::test]
async fn test_malformed_body_is_skipped() -> Result<()> {
    let mock_server = mount_alertmanager(200, 0).await;
    let queue = Arc::new(InMemoryQueue::new());
    let metrics = Arc::new(RelayMetrics::new("sqs2alertmanager"));
    let relay = build_relay(&mock_server.uri(), Arc::clone(&queue), Arc::clone(&metrics))?;

    let outcome = relay
        .process(queue_message("m-1", "{ invalid json }".to_string()))
        .await;

    assert_eq!(outcome, MessageOutcome::Rejected);
    assert!(queue.deleted().is_empty());

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.parse_error, 1);
    assert_eq!(snapshot.alertmanager_ok + snapshot.alertmanager_err, 0);

    Ok(())
}

/// Test: Alarm names that miss the pattern are still delivered
#[tokio::test]
async fn test_unmatched_alarm_is_still_delivered() -> Result<()> {
    let mock_server = mount_alertmanager(200, 1).await;
    let queue = Arc::new(InMemoryQueue::new());
    let metrics = Arc::new(RelayMetrics::new("sqs2alertmanager"));
    let relay = build_relay(&mock_server.uri(), Arc::clone(&queue), Arc::clone(&metrics))?;

    let outcome = relay
        .process(queue_message("m-1", envelope_body(&alarm_json("LegacyDiskAlarm"))))
        .await;

    assert_eq!(outcome, MessageOutcome::Acknowledged);
    assert_eq!(metrics.delivered_for_service(""), 1);
    assert_eq!(metrics.snapshot().pattern_no_match, 1);

    Ok(())
}

/// Test: A failed delete is counted once as an error and never as a success
#[tokio::test]
async fn test_failed_delete_is_counted_not_retried() -> Result<()> {
    let mock_server = mount_alertmanager(200, 1).await;
    let queue = Arc::new(InMemoryQueue::new());
    queue.fail_deletes();
    let metrics = Arc::new(RelayMetrics::new("sqs2alertmanager"));
    let relay = build_relay(&mock_server.uri(), Arc::clone(&queue), Arc::clone(&metrics))?;

    let outcome = relay
        .process(queue_message("m-1", envelope_body(&alarm_json(BILLING_ALARM))))
        .await;

    assert_eq!(outcome, MessageOutcome::AckFailed);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.alertmanager_ok, 1);
    assert_eq!(snapshot.sqs_del_error, 1);
    assert_eq!(snapshot.sqs_del_ok, 0);

    Ok(())
}

/// Test: A redelivered message produces the same alert document again
#[tokio::test]
async fn test_redelivery_produces_identical_alert() -> Result<()> {
    let mock_server = mount_alertmanager(200, 2).await;
    let queue = Arc::new(InMemoryQueue::new());
    queue.fail_deletes();
    let metrics = Arc::new(RelayMetrics::new("sqs2alertmanager"));
    let relay = build_relay(&mock_server.uri(), Arc::clone(&queue), metrics)?;

    let body = envelope_body(&alarm_json(BILLING_ALARM));
    relay.process(queue_message("m-1", body.clone())).await;
    relay.process(queue_message("m-1-redelivered", body)).await;

    let requests = mock_server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 2);

    let first: serde_json::Value = serde_json::from_slice(&requests[0].body)?;
    let second: serde_json::Value = serde_json::from_slice(&requests[1].body)?;
    assert_eq!(first, second);

    Ok(())
}

/// Test: Poller and consumer together deliver valid messages in order and skip bad ones
#[tokio::test]
async fn test_pipeline_processes_messages_sequentially() -> Result<()> {
    let mock_server = mount_alertmanager(200, 3).await;

    let batch = vec![
        queue_message("m-1", envelope_body(&alarm_json(BILLING_ALARM))),
        queue_message("m-2", "not json".to_string()),
        queue_message("m-3", envelope_body(&alarm_json("alert-prod-search-2-0-0-1-latency"))),
    ];
    let queue = Arc::new(InMemoryQueue::with_batches(vec![
        Ok(batch),
        Ok(vec![queue_message(
            "m-4",
            envelope_body(&alarm_json("alert-dev-billing-0-0-0-1-errors")),
        )]),
    ]));
    let metrics = Arc::new(RelayMetrics::new("sqs2alertmanager"));

    let relay = build_relay(&mock_server.uri(), Arc::clone(&queue), Arc::clone(&metrics))?;
    let shared: Arc<dyn MessageQueue> = Arc::clone(&queue) as Arc<dyn MessageQueue>;
    let poller = Poller::new(
        shared,
        Backoff::new(BackoffConfig::default()),
        Arc::clone(&metrics),
    );

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(run_pipeline(poller, relay, 1, cancel.clone()));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while queue.deleted().len() < 3 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    cancel.cancel();
    handle.await?;

    assert_eq!(
        queue.deleted(),
        vec![
            "receipt-m-1".to_string(),
            "receipt-m-3".to_string(),
            "receipt-m-4".to_string()
        ]
    );

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.sqs_rcv_ok, 4);
    assert_eq!(snapshot.parse_error, 1);
    assert_eq!(snapshot.alertmanager_ok, 3);
    assert_eq!(metrics.delivered_for_service("billing"), 2);
    assert_eq!(metrics.delivered_for_service("search"), 1);

    Ok(())
}

/// Test: Snapshots carry the per-service delivery counts
#[tokio::test]
async fn test_snapshot_includes_per_service_counts() -> Result<()> {
    let mock_server = mount_alertmanager(200, 3).await;
    let queue = Arc::new(InMemoryQueue::new());
    let metrics = Arc::new(RelayMetrics::new("sqs2alertmanager"));
    let relay = build_relay(&mock_server.uri(), Arc::clone(&queue), Arc::clone(&metrics))?;

    for (id, name) in [
        ("m-1", BILLING_ALARM),
        ("m-2", BILLING_ALARM),
        ("m-3", "alert-prod-search-1-2-3-4-latency"),
    ] {
        relay.process(queue_message(id, envelope_body(&alarm_json(name)))).await;
    }

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.pattern_no_match, 0);
    assert_eq!(
        snapshot.alerts.into_iter().collect::<Vec<_>>(),
        vec![("billing".to_string(), 2), ("search".to_string(), 1)]
    );

    Ok(())
}
