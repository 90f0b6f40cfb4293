//! Delivery counters for the relay.
//!
//! A single [`RelayMetrics`] is built at startup and shared by reference with the poller,
//! dispatcher, acknowledger and the HTTP server. Counter names carry the configured
//! metric prefix, e.g. `sqs2alertmanager_alertmanager_ok_total`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ServiceLabels {
    pub service: String,
}

/// Point-in-time copy of every counter, for logging and assertions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub sqs_rcv_ok: u64,
    pub sqs_rcv_error: u64,
    pub parse_error: u64,
    pub pattern_no_match: u64,
    pub alertmanager_ok: u64,
    pub alertmanager_err: u64,
    pub sqs_del_ok: u64,
    pub sqs_del_error: u64,
    pub alerts: BTreeMap<String, u64>,
}

pub struct RelayMetrics {
    registry: Registry,
    sqs_rcv_ok: Counter,
    sqs_rcv_error: Counter,
    parse_error: Counter,
    pattern_no_match: Counter,
    alertmanager_ok: Counter,
    alertmanager_err: Counter,
    alerts_per_service: Family<ServiceLabels, Counter>,
    services: Mutex<BTreeSet<String>>,
    sqs_del_ok: Counter,
    sqs_del_error: Counter,
}

impl std::fmt::Debug for RelayMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayMetrics")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl RelayMetrics {
    pub fn new(prefix: &str) -> Self {
        let mut registry = Registry::with_prefix(prefix);

        let sqs_rcv_ok = Counter::default();
        registry.register(
            "sqs_rcv_ok",
            "Messages received from the source queue",
            sqs_rcv_ok.clone(),
        );

        let sqs_rcv_error = Counter::default();
        registry.register(
            "sqs_rcv_error",
            "Failed receive calls against the source queue",
            sqs_rcv_error.clone(),
        );

        let parse_error = Counter::default();
        registry.register(
            "parse_error",
            "Messages skipped because the alarm envelope or payload could not be parsed",
            parse_error.clone(),
        );

        let pattern_no_match = Counter::default();
        registry.register(
            "pattern_no_match",
            "Alarm names the extraction pattern did not match",
            pattern_no_match.clone(),
        );

        let alertmanager_ok = Counter::default();
        registry.register(
            "alertmanager_ok",
            "Alerts accepted by alertmanager",
            alertmanager_ok.clone(),
        );

        let alertmanager_err = Counter::default();
        registry.register(
            "alertmanager_err",
            "Alerts that alertmanager rejected or that could not be sent",
            alertmanager_err.clone(),
        );

        let alerts_per_service = Family::<ServiceLabels, Counter>::default();
        registry.register(
            "alerts",
            "Alerts accepted by alertmanager per service label",
            alerts_per_service.clone(),
        );

        let sqs_del_ok = Counter::default();
        registry.register(
            "sqs_del_ok",
            "Messages deleted from the source queue after delivery",
            sqs_del_ok.clone(),
        );

        let sqs_del_error = Counter::default();
        registry.register(
            "sqs_del_error",
            "Failed deletes against the source queue",
            sqs_del_error.clone(),
        );

        Self {
            registry,
            sqs_rcv_ok,
            sqs_rcv_error,
            parse_error,
            pattern_no_match,
            alertmanager_ok,
            alertmanager_err,
            alerts_per_service,
            services: Mutex::new(BTreeSet::new()),
            sqs_del_ok,
            sqs_del_error,
        }
    }

    pub fn inc_received(&self) {
        self.sqs_rcv_ok.inc();
    }

    pub fn inc_receive_error(&self) {
        self.sqs_rcv_error.inc();
    }

    pub fn inc_parse_error(&self) {
        self.parse_error.inc();
    }

    pub fn inc_pattern_no_match(&self) {
        self.pattern_no_match.inc();
    }

    /// Records an accepted alert, both in total and for its service label.
    pub fn inc_delivered(&self, service: &str) {
        self.alertmanager_ok.inc();
        self.alerts_per_service
            .get_or_create(&ServiceLabels {
                service: service.to_string(),
            })
            .inc();
        self.services
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(service.to_string());
    }

    pub fn inc_delivery_error(&self) {
        self.alertmanager_err.inc();
    }

    pub fn inc_deleted(&self) {
        self.sqs_del_ok.inc();
    }

    pub fn inc_delete_error(&self) {
        self.sqs_del_error.inc();
    }

    pub fn delivered_for_service(&self, service: &str) -> u64 {
        self.alerts_per_service
            .get_or_create(&ServiceLabels {
                service: service.to_string(),
            })
            .get()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let services = self
            .services
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        MetricsSnapshot {
            sqs_rcv_ok: self.sqs_rcv_ok.get(),
            sqs_rcv_error: self.sqs_rcv_error.get(),
            parse_error: self.parse_error.get(),
            pattern_no_match: self.pattern_no_match.get(),
            alertmanager_ok: self.alertmanager_ok.get(),
            alertmanager_err: self.alertmanager_err.get(),
            sqs_del_ok: self.sqs_del_ok.get(),
            sqs_del_error: self.sqs_del_error.get(),
            alerts: services
                .into_iter()
                .map(|service| {
                    let count = self.delivered_for_service(&service);
                    (service, count)
                })
                .collect(),
        }
    }

    /// Renders every counter in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

/// Logs a counter snapshot every `interval` until `cancel` fires.
pub async fn log_metrics_periodically(
    metrics: Arc<RelayMetrics>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                let snapshot = metrics.snapshot();
                info!(
                    sqs_rcv_ok = snapshot.sqs_rcv_ok,
                    sqs_rcv_error = snapshot.sqs_rcv_error,
                    parse_error = snapshot.parse_error,
                    pattern_no_match = snapshot.pattern_no_match,
                    alertmanager_ok = snapshot.alertmanager_ok,
                    alertmanager_err = snapshot.alertmanager_err,
                    sqs_del_ok = snapshot.sqs_del_ok,
                    sqs_del_error = snapshot.sqs_del_error,
                    alerts = ?snapshot.alerts,
                    "Relay metrics"
                );
            }
        }
    }
}
