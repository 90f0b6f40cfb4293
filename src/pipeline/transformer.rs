use std::sync::Arc;

use regex::Regex;
use tracing::warn;

use crate::{
    error::TransformError,
    metrics::RelayMetrics,
    models::{
        alarm::{AlarmEnvelope, AlarmEvent},
        alert::{Alert, Annotations, ExtractedFields, Labels, SEVERITY_CRITICAL},
    },
};

const GROUP_ENV: &str = "env";
const GROUP_SERVICE: &str = "service";
const GROUP_ALARM_NAME: &str = "alarmname";
const GROUP_RUNBOOK: &str = "runbook";

/// Turns queue message bodies into Alertmanager alerts.
///
/// The pattern is compiled once at startup and applied to every alarm name. Recognised
/// capture group names are `env`, `service`, `alarmname` and `runbook`; any other group is
/// ignored.
#[derive(Debug, Clone)]
pub struct AlertTransformer {
    pattern: Regex,
    source_queue: String,
    metrics: Option<Arc<RelayMetrics>>,
}

impl AlertTransformer {
    pub fn new(pattern: Regex, source_queue: impl Into<String>) -> Self {
        Self {
            pattern,
            source_queue: source_queue.into(),
            metrics: None,
        }
    }

    /// Counts alarm names the pattern does not match.
    pub fn with_metrics(mut self, metrics: Arc<RelayMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn transform(&self, body: &str) -> Result<Alert, TransformError> {
        let alarm = Self::parse_alarm(body)?;
        Ok(self.build_alert(&alarm))
    }

    /// Unwraps the notification envelope and decodes the alarm it carries.
    pub fn parse_alarm(body: &str) -> Result<AlarmEvent, TransformError> {
        let envelope: AlarmEnvelope = serde_json::from_str(body)
            .map_err(|e| TransformError::InvalidEnvelope(e.to_string()))?;

        serde_json::from_str(&envelope.message)
            .map_err(|e| TransformError::InvalidAlarm(e.to_string()))
    }

    pub fn extract_fields(&self, alarm_name: &str) -> ExtractedFields {
        let Some(captures) = self.pattern.captures(alarm_name) else {
            if let Some(metrics) = &self.metrics {
                metrics.inc_pattern_no_match();
            }
            warn!(alarm_name, "Alarm name did not match pattern, using empty fields");
            return ExtractedFields::default();
        };

        let group = |name: &str| {
            captures
                .name(name)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        ExtractedFields {
            env: group(GROUP_ENV),
            service: group(GROUP_SERVICE),
            alert_name: group(GROUP_ALARM_NAME),
            runbook: group(GROUP_RUNBOOK),
        }
    }

    pub fn build_alert(&self, alarm: &AlarmEvent) -> Alert {
        let fields = self.extract_fields(&alarm.alarm_name);

        let annotations = Annotations {
            asg: alarm.first_dimension_value().to_string(),
            aws_account_id: alarm.aws_account_id.clone(),
            description: alarm.alarm_description.clone(),
            reason: alarm.new_state_reason.clone(),
            region: alarm.region.clone(),
            source: self.source_queue.clone(),
        };

        // the source alarms carry no severity
        let labels = Labels {
            env: fields.env,
            alertname: fields.alert_name,
            region: alarm.region.clone(),
            service: fields.service,
            severity: SEVERITY_CRITICAL.to_string(),
            runbook_url: fields.runbook,
        };

        Alert {
            annotations,
            generator_url: labels.runbook_url.clone(),
            labels,
        }
    }
}
